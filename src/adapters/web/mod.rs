//! Web server adapter.
//!
//! JSON REST surface over [`PortfolioService`], with stock reads priced
//! through a [`QuotePort`].

mod error;
mod handlers;

pub use error::{WebError, status_from_error};
pub use handlers::*;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::domain::service::PortfolioService;
use crate::ports::quote_port::QuotePort;

pub struct AppState {
    pub service: PortfolioService,
    pub quotes: Arc<dyn QuotePort>,
    /// Upper bound on concurrent quote lookups per listing.
    pub quote_workers: usize,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/stock/{symbol}",
            get(handlers::get_stock)
                .post(handlers::create_stock)
                .put(handlers::put_stock)
                .delete(handlers::delete_stock),
        )
        .route("/stocks", get(handlers::list_stocks))
        .route(
            "/position/{key}",
            get(handlers::positions_for)
                .post(handlers::create_position)
                .delete(handlers::delete_position),
        )
        .route("/positions", get(handlers::list_positions))
        .route(
            "/cash",
            get(handlers::get_cash)
                .post(handlers::create_cash)
                .put(handlers::put_cash)
                .delete(handlers::delete_cash),
        )
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
