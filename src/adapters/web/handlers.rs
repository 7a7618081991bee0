//! HTTP request handlers for the web adapter.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::domain::error::StockfolioError;
use crate::domain::pricing::{price_stock, price_stocks};
use crate::domain::service::PortfolioService;

use super::{AppState, WebError};

#[derive(Debug, Deserialize)]
pub struct StockDescBody {
    pub desc: String,
    pub stop_quote: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct StockBody {
    pub symbol: String,
    pub desc: String,
    pub stop_quote: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct PositionBody {
    pub date: NaiveDate,
    pub quantity: i64,
    pub unit_cost: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CashBody {
    pub balance: Decimal,
}

/// Run a storage call off the async workers; the pool blocks.
async fn with_service<T, F>(state: &AppState, f: F) -> Result<T, StockfolioError>
where
    T: Send + 'static,
    F: FnOnce(&PortfolioService) -> Result<T, StockfolioError> + Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| StockfolioError::Database {
            reason: format!("storage task failed: {e}"),
        })?
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, WebError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| WebError::bad_request(rejection.body_text()))
}

pub async fn get_stock(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Response, WebError> {
    let (stock, positions) = with_service(&state, move |s| s.get_stock(&symbol)).await?;
    let view = price_stock(state.quotes.as_ref(), stock, positions).await;
    Ok(Json(view).into_response())
}

pub async fn list_stocks(State(state): State<Arc<AppState>>) -> Result<Response, WebError> {
    let stocks = with_service(&state, |s| s.list_stocks()).await?;
    let views = price_stocks(state.quotes.as_ref(), stocks, state.quote_workers).await;
    Ok(Json(json!({ "stocks": views })).into_response())
}

pub async fn create_stock(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    payload: Result<Json<StockDescBody>, JsonRejection>,
) -> Result<Response, WebError> {
    let StockDescBody { desc, stop_quote } = body(payload)?;
    let stock =
        with_service(&state, move |s| s.create_stock(&symbol, &desc, stop_quote)).await?;
    Ok((StatusCode::CREATED, Json(stock)).into_response())
}

pub async fn put_stock(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    payload: Result<Json<StockBody>, JsonRejection>,
) -> Result<Response, WebError> {
    let StockBody {
        symbol: new_symbol,
        desc,
        stop_quote,
    } = body(payload)?;
    let stock = with_service(&state, move |s| {
        s.put_stock(&symbol, &new_symbol, &desc, stop_quote)
    })
    .await
    .map_err(|e| {
        let err = WebError::from(e);
        if err.status.is_server_error() {
            err
        } else {
            err.with_status(StatusCode::BAD_REQUEST)
        }
    })?;
    Ok(Json(stock).into_response())
}

pub async fn delete_stock(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Response, WebError> {
    let stock = with_service(&state, move |s| s.delete_stock(&symbol)).await?;
    Ok(Json(stock).into_response())
}

pub async fn positions_for(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Response, WebError> {
    let positions = with_service(&state, move |s| s.positions_for(&symbol)).await?;
    Ok(Json(positions).into_response())
}

pub async fn list_positions(State(state): State<Arc<AppState>>) -> Result<Response, WebError> {
    let positions = with_service(&state, |s| s.list_positions()).await?;
    Ok(Json(json!({ "positions": positions })).into_response())
}

pub async fn create_position(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    payload: Result<Json<PositionBody>, JsonRejection>,
) -> Result<Response, WebError> {
    let PositionBody {
        date,
        quantity,
        unit_cost,
    } = body(payload)?;
    let (position, _) = with_service(&state, move |s| {
        s.create_position(&symbol, date, quantity, unit_cost)
    })
    .await
    .map_err(|e| match e {
        StockfolioError::StockNotFound { .. } => {
            WebError::from(e).with_status(StatusCode::BAD_REQUEST)
        }
        other => other.into(),
    })?;
    Ok((StatusCode::CREATED, Json(position)).into_response())
}

pub async fn delete_position(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, WebError> {
    let id: i64 = key
        .parse()
        .map_err(|_| WebError::bad_request(format!("Not a valid position id: {key}")))?;
    let (position, _) = with_service(&state, move |s| s.delete_position(id))
        .await
        .map_err(|e| match e {
            StockfolioError::CostBasis(_) => WebError::from(e).with_status(StatusCode::BAD_REQUEST),
            other => other.into(),
        })?;
    Ok(Json(position).into_response())
}

pub async fn get_cash(State(state): State<Arc<AppState>>) -> Result<Response, WebError> {
    let cash = with_service(&state, |s| s.get_cash()).await?;
    Ok(Json(cash).into_response())
}

pub async fn create_cash(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CashBody>, JsonRejection>,
) -> Result<Response, WebError> {
    let CashBody { balance } = body(payload)?;
    let cash = with_service(&state, move |s| s.create_cash(balance)).await?;
    Ok((StatusCode::CREATED, Json(cash)).into_response())
}

pub async fn put_cash(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CashBody>, JsonRejection>,
) -> Result<Response, WebError> {
    let CashBody { balance } = body(payload)?;
    let cash = with_service(&state, move |s| s.upsert_cash(balance)).await?;
    Ok(Json(cash).into_response())
}

pub async fn delete_cash(State(state): State<Arc<AppState>>) -> Result<Response, WebError> {
    with_service(&state, |s| s.delete_cash()).await?;
    Ok(Json(json!({ "message": "Cash balance deleted" })).into_response())
}

pub async fn not_found(uri: Uri) -> WebError {
    WebError::not_found(format!("Resource {} not found", uri.path()))
}
