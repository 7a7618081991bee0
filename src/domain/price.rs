//! Live market price attached to stock responses.

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// Value emitted in place of a number when no quote could be fetched.
pub const PRICE_UNAVAILABLE: &str = "ERR";

/// Why a quote lookup produced no price. Never fatal to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteUnavailable {
    #[error("quote request timed out")]
    Timeout,

    #[error("quote request failed: {0}")]
    Transport(String),

    #[error("quote service returned HTTP {0}")]
    Status(u16),

    #[error("quote service error: {0}")]
    Upstream(String),

    #[error("malformed quote response: {0}")]
    Malformed(String),

    #[error("no quote for symbol {0}")]
    UnknownSymbol(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Price {
    Available(Decimal),
    Unavailable,
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Price::Available(p) => Serialize::serialize(p, serializer),
            Price::Unavailable => serializer.serialize_str(PRICE_UNAVAILABLE),
        }
    }
}
