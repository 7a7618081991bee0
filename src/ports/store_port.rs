//! Persistence port for stocks, positions and the cash row.
//!
//! Every method is one transaction: it either applies all of its writes or
//! none of them. Position writes fold the lot into the owning stock's
//! aggregate (see [`crate::domain::cost_basis`]) inside that transaction.

use rust_decimal::Decimal;

use crate::domain::cash::Cash;
use crate::domain::error::StockfolioError;
use crate::domain::position::{NewPosition, Position};
use crate::domain::stock::{NewStock, Stock};

pub trait StorePort {
    fn initialize_schema(&self) -> Result<(), StockfolioError>;

    fn find_stock(&self, symbol: &str) -> Result<Option<Stock>, StockfolioError>;

    /// All stocks ordered by id.
    fn list_stocks(&self) -> Result<Vec<Stock>, StockfolioError>;

    /// Fails with `DuplicateSymbol` when the symbol is taken.
    fn insert_stock(&self, stock: &NewStock) -> Result<Stock, StockfolioError>;

    /// Renames/redescribes the stock currently stored under `symbol`.
    fn update_stock(&self, symbol: &str, changes: &NewStock) -> Result<Stock, StockfolioError>;

    /// Deletes the stock and all of its positions, returning the stock.
    fn delete_stock(&self, symbol: &str) -> Result<Stock, StockfolioError>;

    fn positions_for_stock(&self, stock_id: i64) -> Result<Vec<Position>, StockfolioError>;

    /// All positions ordered by id.
    fn list_positions(&self) -> Result<Vec<Position>, StockfolioError>;

    /// Inserts the position under the stock and adds it to the stock's
    /// aggregate. Fails with `StockNotFound` when `symbol` has no stock.
    fn add_position(
        &self,
        symbol: &str,
        position: &NewPosition,
    ) -> Result<(Position, Stock), StockfolioError>;

    /// Deletes the position and removes it from its stock's aggregate.
    fn remove_position(&self, id: i64) -> Result<(Position, Stock), StockfolioError>;

    fn get_cash(&self) -> Result<Option<Cash>, StockfolioError>;

    /// Creates the cash row; `CashExists` when it is already there.
    fn insert_cash(&self, balance: Decimal) -> Result<Cash, StockfolioError>;

    fn upsert_cash(&self, balance: Decimal) -> Result<Cash, StockfolioError>;

    /// Removes the cash row; `CashNotFound` when there is none.
    fn delete_cash(&self) -> Result<Cash, StockfolioError>;
}
