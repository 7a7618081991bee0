//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::quote_client::{DEFAULT_WORKERS, QuoteClient};
use crate::adapters::store_from_config;
use crate::domain::config_validation::{self, validate_app_config};
use crate::domain::error::StockfolioError;
use crate::domain::price::Price;
use crate::domain::pricing::current_price;
use crate::domain::validation::{normalize_symbol, validate_symbol};
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "stockfolio", about = "Stock portfolio tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Create the database tables
    InitDb {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the current price of a symbol
    Quote {
        #[arg(short, long)]
        config: PathBuf,
        symbol: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Serve { config } => run_serve(&config),
        Command::InitDb { config } => run_init_db(&config),
        Command::Quote { config, symbol } => run_quote(&config, &symbol),
    }
}

/// Load the INI file, apply environment overrides and validate the result.
pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    let config = FileConfigAdapter::from_file(path)
        .map_err(|e| {
            let err = StockfolioError::ConfigParse {
                file: path.display().to_string(),
                reason: e.to_string(),
            };
            eprintln!("error: {err}");
            ExitCode::from(&err)
        })?
        .with_env_overrides();

    validate_app_config(&config).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    Ok(config)
}

/// `RUST_LOG` wins over `[log] level`.
pub fn init_tracing(config: &dyn ConfigPort) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config_validation::log_level(config)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn quote_workers(config: &dyn ConfigPort) -> usize {
    config.get_int("quote", "workers", DEFAULT_WORKERS).max(1) as usize
}

fn runtime() -> Result<tokio::runtime::Runtime, ExitCode> {
    tokio::runtime::Runtime::new().map_err(|e| {
        let err = StockfolioError::Io(e);
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_init_db(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    init_tracing(&config);

    let result = store_from_config(&config).and_then(|store| store.initialize_schema());
    match result {
        Ok(()) => {
            eprintln!("Database initialized");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_quote(config_path: &PathBuf, symbol: &str) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    init_tracing(&config);

    let symbol = normalize_symbol(symbol);
    if let Err(e) = validate_symbol(&symbol) {
        let err = StockfolioError::from(e);
        eprintln!("error: {err}");
        return ExitCode::from(&err);
    }

    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };
    let client = match QuoteClient::from_config(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };
    match rt.block_on(current_price(&client, &symbol)) {
        Price::Available(price) => {
            println!("{symbol} {price}");
            ExitCode::SUCCESS
        }
        Price::Unavailable => {
            println!("{symbol} ERR");
            ExitCode::from(1)
        }
    }
}

fn run_serve(config_path: &PathBuf) -> ExitCode {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, build_router};
        use crate::domain::service::PortfolioService;
        use std::sync::Arc;
        use tracing::info;

        eprintln!("Loading config from {}", config_path.display());
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(code) => return code,
        };
        init_tracing(&config);

        let store = match store_from_config(&config) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(&e);
            }
        };
        if let Err(e) = store.initialize_schema() {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }

        let addr = match config_validation::listen_addr(&config) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(&e);
            }
        };

        let quotes = match QuoteClient::from_config(&config) {
            Ok(q) => q,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(&e);
            }
        };

        let state = AppState {
            service: PortfolioService::new(store),
            quotes: Arc::new(quotes),
            quote_workers: quote_workers(&config),
        };
        let router = build_router(state);

        let rt = match runtime() {
            Ok(rt) => rt,
            Err(code) => return code,
        };
        let served: Result<(), std::io::Error> = rt.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(%addr, "listening");
            eprintln!("Starting web server on {addr}");
            axum::serve(listener, router).await
        });

        match served {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                let err = StockfolioError::Io(e);
                eprintln!("error: {err}");
                ExitCode::from(&err)
            }
        }
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        eprintln!("error: web feature is required for serve");
        ExitCode::from(1)
    }
}
