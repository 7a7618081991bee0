//! Market quote port trait.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::price::QuoteUnavailable;

#[async_trait]
pub trait QuotePort: Send + Sync {
    /// Current price for `symbol`. Implementations must not block for long;
    /// callers treat every error as "price unavailable".
    async fn fetch_price(&self, symbol: &str) -> Result<Decimal, QuoteUnavailable>;
}
