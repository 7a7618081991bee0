//! JSON error responses for the web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::error;

use crate::domain::error::StockfolioError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
    pub fields: Option<BTreeMap<&'static str, Vec<String>>>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a BTreeMap<&'static str, Vec<String>>>,
}

impl WebError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
            fields: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NotFound", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BadRequest", message)
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "InternalError",
            "internal error",
        )
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

pub fn status_from_error(err: &StockfolioError) -> StatusCode {
    match err {
        StockfolioError::Validation(_)
        | StockfolioError::DuplicateSymbol { .. }
        | StockfolioError::CashExists
        | StockfolioError::CashNotFound => StatusCode::BAD_REQUEST,
        StockfolioError::StockNotFound { .. }
        | StockfolioError::PositionNotFound { .. }
        | StockfolioError::PositionsNotFound { .. } => StatusCode::NOT_FOUND,
        StockfolioError::Conflict { .. } | StockfolioError::CostBasis(_) => StatusCode::CONFLICT,
        StockfolioError::Database { .. }
        | StockfolioError::DatabaseQuery { .. }
        | StockfolioError::Io(_)
        | StockfolioError::ConfigParse { .. }
        | StockfolioError::ConfigMissing { .. }
        | StockfolioError::ConfigInvalid { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<StockfolioError> for WebError {
    fn from(err: StockfolioError) -> Self {
        let status = status_from_error(&err);
        if status.is_server_error() {
            error!(error = %err, "request failed");
            return Self::internal();
        }

        let fields = match &err {
            StockfolioError::Validation(errors) => {
                let mut fields: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
                for e in errors.errors() {
                    fields.entry(e.field()).or_default().push(e.to_string());
                }
                Some(fields)
            }
            _ => None,
        };

        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
            fields,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: &self.message,
            error: self.kind,
            errors: self.fields.as_ref(),
        };
        (self.status, Json(body)).into_response()
    }
}
