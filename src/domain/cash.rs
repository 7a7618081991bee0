//! Single-row cash balance.

use rust_decimal::Decimal;
use serde::Serialize;

/// The only identity a cash row may have.
pub const CASH_ID: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cash {
    pub id: i64,
    pub balance: Decimal,
}

impl Cash {
    pub fn new(balance: Decimal) -> Self {
        Cash {
            id: CASH_ID,
            balance,
        }
    }
}
