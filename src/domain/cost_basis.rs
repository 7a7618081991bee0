//! Weighted-average cost basis of a stock's held shares.
//!
//! The aggregate is maintained incrementally: every position written or
//! removed is folded into `(quantity, unit_cost)` as a signed lot. Removing a
//! position folds in the same unit cost with the quantity negated.

use rust_decimal::{Decimal, RoundingStrategy};

use super::position::Position;
use super::stock::Stock;
use super::validation::PRICE_PRECISION;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CostBasisError {
    #[error("cannot remove {requested} shares of {symbol}: only {held} held")]
    Oversold {
        symbol: String,
        held: i64,
        requested: i64,
    },

    #[error("cost basis of {symbol} is out of range")]
    Overflow { symbol: String },
}

/// Fold a lot of `delta_quantity` shares at `delta_unit_cost` into the stock.
///
/// A resulting quantity of zero resets the unit cost to zero. A negative
/// result is rejected and the stock is left as it was.
pub fn recompute(
    stock: &mut Stock,
    delta_unit_cost: Decimal,
    delta_quantity: i64,
) -> Result<(), CostBasisError> {
    let overflow = || CostBasisError::Overflow {
        symbol: stock.symbol.clone(),
    };

    let new_quantity = stock
        .quantity
        .checked_add(delta_quantity)
        .ok_or_else(overflow)?;

    if new_quantity < 0 {
        return Err(CostBasisError::Oversold {
            symbol: stock.symbol.clone(),
            held: stock.quantity,
            requested: -delta_quantity,
        });
    }

    let new_unit_cost = if new_quantity == 0 {
        Decimal::ZERO
    } else {
        let held_cost = Decimal::from(stock.quantity)
            .checked_mul(stock.unit_cost)
            .ok_or_else(overflow)?;
        let lot_cost = Decimal::from(delta_quantity)
            .checked_mul(delta_unit_cost)
            .ok_or_else(overflow)?;
        held_cost
            .checked_add(lot_cost)
            .and_then(|total| total.checked_div(Decimal::from(new_quantity)))
            .ok_or_else(overflow)?
            .round_dp_with_strategy(PRICE_PRECISION, RoundingStrategy::MidpointAwayFromZero)
    };

    stock.quantity = new_quantity;
    stock.unit_cost = new_unit_cost;
    Ok(())
}

pub fn apply_position(stock: &mut Stock, position: &Position) -> Result<(), CostBasisError> {
    recompute(stock, position.unit_cost, position.quantity)
}

pub fn reverse_position(stock: &mut Stock, position: &Position) -> Result<(), CostBasisError> {
    recompute(stock, position.unit_cost, -position.quantity)
}
