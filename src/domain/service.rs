//! Record lifecycle operations over a [`StorePort`].
//!
//! Input is normalized and validated here, before any storage call. The
//! store owns transactions; this layer decides which store call a request
//! maps to and what "not found" means for it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::cash::Cash;
use super::error::StockfolioError;
use super::position::{NewPosition, Position};
use super::stock::{NewStock, Stock};
use super::validation::{
    normalize_symbol, validate_cash, validate_new_position, validate_new_stock,
};
use crate::ports::store_port::StorePort;

#[derive(Clone)]
pub struct PortfolioService {
    store: Arc<dyn StorePort + Send + Sync>,
}

impl PortfolioService {
    pub fn new(store: Arc<dyn StorePort + Send + Sync>) -> Self {
        Self { store }
    }

    /// Stock with its positions.
    pub fn get_stock(&self, symbol: &str) -> Result<(Stock, Vec<Position>), StockfolioError> {
        let symbol = normalize_symbol(symbol);
        let stock = self.require_stock(&symbol)?;
        let positions = self.store.positions_for_stock(stock.id)?;
        debug!(symbol = %stock.symbol, positions = positions.len(), "stock loaded");
        Ok((stock, positions))
    }

    /// Every stock, in storage order, each with its positions.
    pub fn list_stocks(&self) -> Result<Vec<(Stock, Vec<Position>)>, StockfolioError> {
        let stocks = self.store.list_stocks()?;
        let mut by_stock: HashMap<i64, Vec<Position>> = HashMap::new();
        for position in self.store.list_positions()? {
            by_stock.entry(position.stock_id).or_default().push(position);
        }
        Ok(stocks
            .into_iter()
            .map(|stock| {
                let positions = by_stock.remove(&stock.id).unwrap_or_default();
                (stock, positions)
            })
            .collect())
    }

    pub fn create_stock(
        &self,
        symbol: &str,
        desc: &str,
        stop_quote: Option<Decimal>,
    ) -> Result<Stock, StockfolioError> {
        let new_stock = NewStock::new(symbol, desc, stop_quote);
        StockfolioError::check(validate_new_stock(
            &new_stock.symbol,
            &new_stock.desc,
            new_stock.stop_quote,
        ))?;
        debug!(symbol = %new_stock.symbol, "creating stock");
        self.store.insert_stock(&new_stock)
    }

    /// Rename or redescribe an existing stock.
    pub fn update_stock(
        &self,
        symbol: &str,
        new_symbol: &str,
        desc: &str,
        stop_quote: Option<Decimal>,
    ) -> Result<Stock, StockfolioError> {
        let symbol = normalize_symbol(symbol);
        let changes = NewStock::new(new_symbol, desc, stop_quote);
        StockfolioError::check(validate_new_stock(
            &changes.symbol,
            &changes.desc,
            changes.stop_quote,
        ))?;
        debug!(from = %symbol, to = %changes.symbol, "updating stock");
        self.store.update_stock(&symbol, &changes)
    }

    /// Update the stock stored under `symbol`, or create one from the body
    /// when there is none.
    pub fn put_stock(
        &self,
        symbol: &str,
        new_symbol: &str,
        desc: &str,
        stop_quote: Option<Decimal>,
    ) -> Result<Stock, StockfolioError> {
        let symbol = normalize_symbol(symbol);
        match self.store.find_stock(&symbol)? {
            Some(_) => self.update_stock(&symbol, new_symbol, desc, stop_quote),
            None => self.create_stock(new_symbol, desc, stop_quote),
        }
    }

    pub fn delete_stock(&self, symbol: &str) -> Result<Stock, StockfolioError> {
        let symbol = normalize_symbol(symbol);
        debug!(symbol = %symbol, "deleting stock");
        self.store.delete_stock(&symbol)
    }

    /// Positions of one stock. An empty list is reported as not found.
    pub fn positions_for(&self, symbol: &str) -> Result<Vec<Position>, StockfolioError> {
        let symbol = normalize_symbol(symbol);
        let stock = self.require_stock(&symbol)?;
        let positions = self.store.positions_for_stock(stock.id)?;
        if positions.is_empty() {
            return Err(StockfolioError::PositionsNotFound { symbol });
        }
        Ok(positions)
    }

    pub fn list_positions(&self) -> Result<Vec<Position>, StockfolioError> {
        self.store.list_positions()
    }

    /// Record a buy lot and fold it into the stock's cost basis.
    pub fn create_position(
        &self,
        symbol: &str,
        position_date: NaiveDate,
        quantity: i64,
        unit_cost: Decimal,
    ) -> Result<(Position, Stock), StockfolioError> {
        let symbol = normalize_symbol(symbol);
        StockfolioError::check(validate_new_position(quantity, unit_cost))?;
        let position = NewPosition {
            position_date,
            quantity,
            unit_cost,
        };
        let (position, stock) = self.store.add_position(&symbol, &position)?;
        debug!(
            symbol = %stock.symbol,
            position_id = position.id,
            quantity = stock.quantity,
            unit_cost = %stock.unit_cost,
            "position added"
        );
        Ok((position, stock))
    }

    /// Delete a lot and reverse its effect on the stock's cost basis.
    pub fn delete_position(&self, id: i64) -> Result<(Position, Stock), StockfolioError> {
        let (position, stock) = self.store.remove_position(id)?;
        debug!(
            symbol = %stock.symbol,
            position_id = position.id,
            quantity = stock.quantity,
            unit_cost = %stock.unit_cost,
            "position removed"
        );
        Ok((position, stock))
    }

    pub fn get_cash(&self) -> Result<Cash, StockfolioError> {
        self.store.get_cash()?.ok_or(StockfolioError::CashNotFound)
    }

    /// Create the cash row. Fails when it already exists.
    pub fn create_cash(&self, balance: Decimal) -> Result<Cash, StockfolioError> {
        StockfolioError::check(validate_cash(balance))?;
        debug!(balance = %balance, "creating cash balance");
        self.store.insert_cash(balance)
    }

    /// Create or overwrite the cash balance.
    pub fn upsert_cash(&self, balance: Decimal) -> Result<Cash, StockfolioError> {
        StockfolioError::check(validate_cash(balance))?;
        debug!(balance = %balance, "saving cash balance");
        self.store.upsert_cash(balance)
    }

    pub fn delete_cash(&self) -> Result<Cash, StockfolioError> {
        self.store.delete_cash()
    }

    fn require_stock(&self, symbol: &str) -> Result<Stock, StockfolioError> {
        self.store
            .find_stock(symbol)?
            .ok_or_else(|| StockfolioError::StockNotFound {
                symbol: symbol.to_string(),
            })
    }
}
