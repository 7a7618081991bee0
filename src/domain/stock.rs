//! Stock reference data and its held-share aggregate.

use rust_decimal::Decimal;
use serde::Serialize;

use super::position::Position;
use super::price::Price;
use super::validation::normalize_symbol;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stock {
    pub id: i64,
    pub symbol: String,
    pub desc: String,
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub stop_quote: Option<Decimal>,
}

/// Symbol and description for a stock that is about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStock {
    pub symbol: String,
    pub desc: String,
    pub stop_quote: Option<Decimal>,
}

impl NewStock {
    pub fn new(symbol: &str, desc: &str, stop_quote: Option<Decimal>) -> Self {
        NewStock {
            symbol: normalize_symbol(symbol),
            desc: desc.trim().to_string(),
            stop_quote,
        }
    }
}

/// Stock as returned by read endpoints: live price and, for detail views,
/// the positions it owns.
#[derive(Debug, Clone, Serialize)]
pub struct StockView {
    #[serde(flatten)]
    pub stock: Stock,
    pub price: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<Position>>,
}

impl StockView {
    pub fn detailed(stock: Stock, price: Price, positions: Vec<Position>) -> Self {
        StockView {
            stock,
            price,
            positions: Some(positions),
        }
    }
}
