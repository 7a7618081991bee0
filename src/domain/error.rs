//! Domain error types.

use super::cost_basis::CostBasisError;
use super::validation::{ValidationError, ValidationErrors};

/// Top-level error type for stockfolio.
#[derive(Debug, thiserror::Error)]
pub enum StockfolioError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Stock {symbol} not found")]
    StockNotFound { symbol: String },

    #[error("Stock {symbol} already exist")]
    DuplicateSymbol { symbol: String },

    #[error("Position id {id} not found")]
    PositionNotFound { id: i64 },

    #[error("Positions for symbol {symbol} not found")]
    PositionsNotFound { symbol: String },

    #[error("Cash balance not found")]
    CashNotFound,

    #[error("Cash balance already exists")]
    CashExists,

    #[error("conflict: {reason}")]
    Conflict { reason: String },

    #[error(transparent)]
    CostBasis(#[from] CostBasisError),

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StockfolioError {
    /// Turn a non-empty list of field failures into an error.
    pub fn check(errors: Vec<ValidationError>) -> Result<(), StockfolioError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(StockfolioError::Validation(ValidationErrors(errors)))
        }
    }

    /// Stable kind name surfaced to HTTP clients.
    pub fn kind(&self) -> &'static str {
        match self {
            StockfolioError::Validation(errors) => errors.code(),
            StockfolioError::StockNotFound { .. } => "StockNotFound",
            StockfolioError::DuplicateSymbol { .. } => "DuplicateSymbol",
            StockfolioError::PositionNotFound { .. } => "PositionNotFound",
            StockfolioError::PositionsNotFound { .. } => "PositionsNotFound",
            StockfolioError::CashNotFound => "CashNotFound",
            StockfolioError::CashExists => "CashExists",
            StockfolioError::Conflict { .. } | StockfolioError::CostBasis(_) => "Conflict",
            StockfolioError::Database { .. }
            | StockfolioError::DatabaseQuery { .. }
            | StockfolioError::Io(_) => "InternalError",
            StockfolioError::ConfigParse { .. }
            | StockfolioError::ConfigMissing { .. }
            | StockfolioError::ConfigInvalid { .. } => "ConfigError",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StockfolioError::StockNotFound { .. }
                | StockfolioError::PositionNotFound { .. }
                | StockfolioError::PositionsNotFound { .. }
                | StockfolioError::CashNotFound
        )
    }
}

impl From<ValidationError> for StockfolioError {
    fn from(err: ValidationError) -> Self {
        StockfolioError::Validation(err.into())
    }
}

impl From<&StockfolioError> for std::process::ExitCode {
    fn from(err: &StockfolioError) -> Self {
        let code: u8 = match err {
            StockfolioError::Io(_) => 1,
            StockfolioError::ConfigParse { .. }
            | StockfolioError::ConfigMissing { .. }
            | StockfolioError::ConfigInvalid { .. } => 2,
            StockfolioError::Database { .. } | StockfolioError::DatabaseQuery { .. } => 3,
            StockfolioError::Validation(_) => 4,
            StockfolioError::StockNotFound { .. }
            | StockfolioError::PositionNotFound { .. }
            | StockfolioError::PositionsNotFound { .. }
            | StockfolioError::CashNotFound => 5,
            StockfolioError::DuplicateSymbol { .. }
            | StockfolioError::CashExists
            | StockfolioError::Conflict { .. }
            | StockfolioError::CostBasis(_) => 6,
        };
        std::process::ExitCode::from(code)
    }
}
