//! Dated buy lots owned by a stock.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub id: i64,
    pub quantity: i64,
    #[serde(rename = "date")]
    pub position_date: NaiveDate,
    pub unit_cost: Decimal,
    pub stock_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPosition {
    pub position_date: NaiveDate,
    pub quantity: i64,
    pub unit_cost: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn serializes_date_key() {
        let position = Position {
            id: 3,
            quantity: 10,
            position_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            unit_cost: dec!(200.00),
            stock_id: 1,
        };
        let json = serde_json::to_value(&position).unwrap();
        assert_eq!(json["date"], "2024-02-01");
        assert_eq!(json["unit_cost"], 200.0);
        assert_eq!(json["stock_id"], 1);
        assert!(json.get("position_date").is_none());
    }
}
