//! INI file configuration adapter.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    /// Apply the deployment environment on top of the file:
    /// `DATABASE_URL` selects PostgreSQL when it is a postgres URL and
    /// `DEBUG_LEVEL` sets the log level.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var("DATABASE_URL").ok(),
            std::env::var("DEBUG_LEVEL").ok(),
        )
    }

    fn with_overrides(mut self, database_url: Option<String>, debug_level: Option<String>) -> Self {
        if let Some(url) = database_url.filter(|u| u.starts_with("postgres")) {
            self.config.set("database", "backend", Some("postgres".into()));
            self.config.set("postgres", "connection_string", Some(url));
        }
        if let Some(level) = debug_level.filter(|l| !l.trim().is_empty()) {
            self.config.set("log", "level", Some(level));
        }
        self
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }
}
