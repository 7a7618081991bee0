#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

use stockfolio::domain::cash::{CASH_ID, Cash};
use stockfolio::domain::cost_basis::{apply_position, reverse_position};
use stockfolio::domain::error::StockfolioError;
use stockfolio::domain::position::{NewPosition, Position};
use stockfolio::domain::price::QuoteUnavailable;
use stockfolio::domain::stock::{NewStock, Stock};
use stockfolio::ports::config_port::ConfigPort;
use stockfolio::ports::quote_port::QuotePort;
use stockfolio::ports::store_port::StorePort;

#[derive(Default)]
struct MockState {
    stocks: Vec<Stock>,
    positions: Vec<Position>,
    cash: Option<Cash>,
    next_stock_id: i64,
    next_position_id: i64,
}

/// In-memory store. A single mutex stands in for the database transaction.
#[derive(Default)]
pub struct MockStore {
    state: Mutex<MockState>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorePort for MockStore {
    fn initialize_schema(&self) -> Result<(), StockfolioError> {
        Ok(())
    }

    fn find_stock(&self, symbol: &str) -> Result<Option<Stock>, StockfolioError> {
        let state = self.state.lock().unwrap();
        Ok(state.stocks.iter().find(|s| s.symbol == symbol).cloned())
    }

    fn list_stocks(&self) -> Result<Vec<Stock>, StockfolioError> {
        Ok(self.state.lock().unwrap().stocks.clone())
    }

    fn insert_stock(&self, stock: &NewStock) -> Result<Stock, StockfolioError> {
        let mut state = self.state.lock().unwrap();
        if state.stocks.iter().any(|s| s.symbol == stock.symbol) {
            return Err(StockfolioError::DuplicateSymbol {
                symbol: stock.symbol.clone(),
            });
        }
        state.next_stock_id += 1;
        let stock = Stock {
            id: state.next_stock_id,
            symbol: stock.symbol.clone(),
            desc: stock.desc.clone(),
            quantity: 0,
            unit_cost: Decimal::ZERO,
            stop_quote: stock.stop_quote,
        };
        state.stocks.push(stock.clone());
        Ok(stock)
    }

    fn update_stock(&self, symbol: &str, changes: &NewStock) -> Result<Stock, StockfolioError> {
        let mut state = self.state.lock().unwrap();
        let idx = state
            .stocks
            .iter()
            .position(|s| s.symbol == symbol)
            .ok_or_else(|| StockfolioError::StockNotFound {
                symbol: symbol.to_string(),
            })?;
        let id = state.stocks[idx].id;
        if state
            .stocks
            .iter()
            .any(|s| s.symbol == changes.symbol && s.id != id)
        {
            return Err(StockfolioError::DuplicateSymbol {
                symbol: changes.symbol.clone(),
            });
        }
        let stock = &mut state.stocks[idx];
        stock.symbol = changes.symbol.clone();
        stock.desc = changes.desc.clone();
        stock.stop_quote = changes.stop_quote;
        Ok(stock.clone())
    }

    fn delete_stock(&self, symbol: &str) -> Result<Stock, StockfolioError> {
        let mut state = self.state.lock().unwrap();
        let idx = state
            .stocks
            .iter()
            .position(|s| s.symbol == symbol)
            .ok_or_else(|| StockfolioError::StockNotFound {
                symbol: symbol.to_string(),
            })?;
        let stock = state.stocks.remove(idx);
        state.positions.retain(|p| p.stock_id != stock.id);
        Ok(stock)
    }

    fn positions_for_stock(&self, stock_id: i64) -> Result<Vec<Position>, StockfolioError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .positions
            .iter()
            .filter(|p| p.stock_id == stock_id)
            .cloned()
            .collect())
    }

    fn list_positions(&self) -> Result<Vec<Position>, StockfolioError> {
        Ok(self.state.lock().unwrap().positions.clone())
    }

    fn add_position(
        &self,
        symbol: &str,
        position: &NewPosition,
    ) -> Result<(Position, Stock), StockfolioError> {
        let mut state = self.state.lock().unwrap();
        let idx = state
            .stocks
            .iter()
            .position(|s| s.symbol == symbol)
            .ok_or_else(|| StockfolioError::StockNotFound {
                symbol: symbol.to_string(),
            })?;
        let position = Position {
            id: state.next_position_id + 1,
            quantity: position.quantity,
            position_date: position.position_date,
            unit_cost: position.unit_cost,
            stock_id: state.stocks[idx].id,
        };
        let mut stock = state.stocks[idx].clone();
        apply_position(&mut stock, &position)?;
        state.next_position_id += 1;
        state.stocks[idx] = stock.clone();
        state.positions.push(position.clone());
        Ok((position, stock))
    }

    fn remove_position(&self, id: i64) -> Result<(Position, Stock), StockfolioError> {
        let mut state = self.state.lock().unwrap();
        let pidx = state
            .positions
            .iter()
            .position(|p| p.id == id)
            .ok_or(StockfolioError::PositionNotFound { id })?;
        let position = state.positions[pidx].clone();
        let sidx = state
            .stocks
            .iter()
            .position(|s| s.id == position.stock_id)
            .ok_or_else(|| StockfolioError::Conflict {
                reason: format!("position {id} has no stock"),
            })?;
        let mut stock = state.stocks[sidx].clone();
        reverse_position(&mut stock, &position)?;
        state.stocks[sidx] = stock.clone();
        state.positions.remove(pidx);
        Ok((position, stock))
    }

    fn get_cash(&self) -> Result<Option<Cash>, StockfolioError> {
        Ok(self.state.lock().unwrap().cash.clone())
    }

    fn insert_cash(&self, balance: Decimal) -> Result<Cash, StockfolioError> {
        let mut state = self.state.lock().unwrap();
        if state.cash.is_some() {
            return Err(StockfolioError::CashExists);
        }
        let cash = Cash::new(balance);
        state.cash = Some(cash.clone());
        Ok(cash)
    }

    fn upsert_cash(&self, balance: Decimal) -> Result<Cash, StockfolioError> {
        let cash = Cash {
            id: CASH_ID,
            balance,
        };
        self.state.lock().unwrap().cash = Some(cash.clone());
        Ok(cash)
    }

    fn delete_cash(&self) -> Result<Cash, StockfolioError> {
        self.state
            .lock()
            .unwrap()
            .cash
            .take()
            .ok_or(StockfolioError::CashNotFound)
    }
}

/// Fixed prices; any other symbol is unknown upstream.
#[derive(Default)]
pub struct MockQuotes {
    pub prices: HashMap<String, Decimal>,
}

impl MockQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }
}

#[async_trait]
impl QuotePort for MockQuotes {
    async fn fetch_price(&self, symbol: &str) -> Result<Decimal, QuoteUnavailable> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| QuoteUnavailable::UnknownSymbol(symbol.to_string()))
    }
}

/// Config backed by a `(section, key) -> value` map.
#[derive(Default)]
pub struct MockConfigPort {
    pub values: HashMap<(String, String), String>,
}

impl MockConfigPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, section: &str, key: &str, value: &str) -> Self {
        self.values
            .insert((section.to_string(), key.to_string()), value.to_string());
        self
    }
}

impl ConfigPort for MockConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.values
            .get(&(section.to_string(), key.to_string()))
            .cloned()
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.get_string(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}
