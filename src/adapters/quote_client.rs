//! HTTP quote client for a Finnhub-compatible `/quote` endpoint.
//!
//! `GET {base_url}/quote?symbol=S&token=T` answers with a JSON object whose
//! `c` field is the current price, or with an `error` field. Finnhub answers
//! unknown symbols with `c = 0`, which is treated as no quote.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, error};

use crate::domain::error::StockfolioError;

use crate::domain::price::QuoteUnavailable;
use crate::domain::validation::PRICE_PRECISION;
use crate::ports::config_port::ConfigPort;
use crate::ports::quote_port::QuotePort;

pub const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";
pub const DEFAULT_TIMEOUT_MS: i64 = 800;
pub const DEFAULT_WORKERS: i64 = 8;

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    error: Option<String>,
}

pub struct QuoteClient {
    client: Client,
    base_url: String,
    token: String,
}

impl QuoteClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, StockfolioError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            error!(error = %e, "failed to build quote HTTP client");
            StockfolioError::ConfigInvalid {
                section: "quote".to_string(),
                key: "timeout_ms".to_string(),
                reason: format!("cannot build HTTP client: {e}"),
            }
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// `[quote] base_url`, `token` and `timeout_ms`. `QUOTE_TOKEN` in the
    /// environment overrides the configured token.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockfolioError> {
        let base_url = config.get_string_or("quote", "base_url", DEFAULT_BASE_URL);
        let token = std::env::var("QUOTE_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| config.get_string_or("quote", "token", ""));
        let timeout_ms = config.get_int("quote", "timeout_ms", DEFAULT_TIMEOUT_MS).max(1) as u64;
        Self::new(&base_url, &token, Duration::from_millis(timeout_ms))
    }

    async fn request(&self, symbol: &str) -> Result<String, QuoteUnavailable> {
        let url = format!("{}/quote", self.base_url);
        debug!(symbol = %symbol, "quote request");

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("token", self.token.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    QuoteUnavailable::Timeout
                } else {
                    QuoteUnavailable::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuoteUnavailable::Status(status.as_u16()));
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                QuoteUnavailable::Timeout
            } else {
                QuoteUnavailable::Transport(e.to_string())
            }
        })
    }
}

/// Extract the current price from a quote response body.
pub fn parse_quote(symbol: &str, body: &str) -> Result<Decimal, QuoteUnavailable> {
    let response: QuoteResponse =
        serde_json::from_str(body).map_err(|e| QuoteUnavailable::Malformed(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(QuoteUnavailable::Upstream(error));
    }

    let close = response
        .c
        .ok_or_else(|| QuoteUnavailable::Malformed("missing field `c`".to_string()))?;
    if close <= 0.0 {
        return Err(QuoteUnavailable::UnknownSymbol(symbol.to_string()));
    }

    Decimal::try_from(close)
        .map(|p| p.round_dp(PRICE_PRECISION))
        .map_err(|_| QuoteUnavailable::Malformed(format!("invalid price {close}")))
}

#[async_trait]
impl QuotePort for QuoteClient {
    async fn fetch_price(&self, symbol: &str) -> Result<Decimal, QuoteUnavailable> {
        let body = self.request(symbol).await?;
        parse_quote(symbol, &body)
    }
}
