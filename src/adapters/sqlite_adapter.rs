//! SQLite storage adapter.

use crate::domain::cash::{CASH_ID, Cash};
use crate::domain::cost_basis::{apply_position, reverse_position};
use crate::domain::error::StockfolioError;
use crate::domain::position::{NewPosition, Position};
use crate::domain::stock::{NewStock, Stock};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row, Transaction, TransactionBehavior};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;
use tracing::error;

const STOCK_COLUMNS: &str = "id, symbol, description, quantity, unit_cost, stop_quote";
const POSITION_COLUMNS: &str = "id, quantity, position_date, unit_cost, stock_id";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(e: r2d2::Error) -> StockfolioError {
    error!(error = %e, "sqlite pool error");
    StockfolioError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> StockfolioError {
    error!(error = %e, "sqlite query error");
    StockfolioError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn parse_decimal(idx: usize, text: &str) -> Result<Decimal, rusqlite::Error> {
    Decimal::from_str(text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn stock_from_row(row: &Row<'_>) -> Result<Stock, rusqlite::Error> {
    let unit_cost: String = row.get(4)?;
    let stop_quote: Option<String> = row.get(5)?;
    Ok(Stock {
        id: row.get(0)?,
        symbol: row.get(1)?,
        desc: row.get(2)?,
        quantity: row.get(3)?,
        unit_cost: parse_decimal(4, &unit_cost)?,
        stop_quote: stop_quote.map(|q| parse_decimal(5, &q)).transpose()?,
    })
}

fn position_from_row(row: &Row<'_>) -> Result<Position, rusqlite::Error> {
    let date_str: String = row.get(2)?;
    let position_date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let unit_cost: String = row.get(3)?;
    Ok(Position {
        id: row.get(0)?,
        quantity: row.get(1)?,
        position_date,
        unit_cost: parse_decimal(3, &unit_cost)?,
        stock_id: row.get(4)?,
    })
}

fn stock_by_symbol(tx: &Transaction<'_>, symbol: &str) -> Result<Option<Stock>, StockfolioError> {
    tx.query_row(
        &format!("SELECT {STOCK_COLUMNS} FROM stock WHERE symbol = ?1"),
        params![symbol],
        stock_from_row,
    )
    .optional()
    .map_err(query_err)
}

fn stock_by_id(tx: &Transaction<'_>, id: i64) -> Result<Stock, StockfolioError> {
    tx.query_row(
        &format!("SELECT {STOCK_COLUMNS} FROM stock WHERE id = ?1"),
        params![id],
        stock_from_row,
    )
    .map_err(query_err)
}

fn write_aggregate(tx: &Transaction<'_>, stock: &Stock) -> Result<(), StockfolioError> {
    tx.execute(
        "UPDATE stock SET quantity = ?1, unit_cost = ?2 WHERE id = ?3",
        params![stock.quantity, stock.unit_cost.to_string(), stock.id],
    )
    .map_err(query_err)?;
    Ok(())
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockfolioError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| StockfolioError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path).with_init(|c| {
            c.busy_timeout(Duration::from_secs(5))?;
            c.execute_batch("PRAGMA foreign_keys = ON;")
        });
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, StockfolioError> {
        let manager =
            SqliteConnectionManager::memory().with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StockfolioError> {
        self.pool.get().map_err(db_err)
    }

    /// Run `f` in an IMMEDIATE transaction, committing only when it succeeds.
    /// Dropping the transaction on an error path rolls it back.
    fn write<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, StockfolioError>,
    ) -> Result<T, StockfolioError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_err)?;
        let value = f(&tx)?;
        tx.commit().map_err(query_err)?;
        Ok(value)
    }

    fn query_positions(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Position>, StockfolioError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(query_err)?;
        let rows = stmt
            .query_map(params, position_from_row)
            .map_err(query_err)?;

        let mut positions = Vec::new();
        for row in rows {
            positions.push(row.map_err(query_err)?);
        }
        Ok(positions)
    }
}

impl StorePort for SqliteAdapter {
    fn initialize_schema(&self) -> Result<(), StockfolioError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS stock (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL,
                quantity INTEGER NOT NULL DEFAULT 0,
                unit_cost TEXT NOT NULL DEFAULT '0',
                stop_quote TEXT
            );
            CREATE TABLE IF NOT EXISTS positions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                stock_id INTEGER NOT NULL REFERENCES stock(id) ON DELETE CASCADE,
                quantity INTEGER NOT NULL,
                position_date TEXT NOT NULL,
                unit_cost TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_positions_stock_id ON positions(stock_id);
            CREATE TABLE IF NOT EXISTS cash (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                balance TEXT NOT NULL
            );",
        )
        .map_err(query_err)?;

        Ok(())
    }

    fn find_stock(&self, symbol: &str) -> Result<Option<Stock>, StockfolioError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {STOCK_COLUMNS} FROM stock WHERE symbol = ?1"),
            params![symbol],
            stock_from_row,
        )
        .optional()
        .map_err(query_err)
    }

    fn list_stocks(&self) -> Result<Vec<Stock>, StockfolioError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {STOCK_COLUMNS} FROM stock ORDER BY id"))
            .map_err(query_err)?;
        let rows = stmt.query_map([], stock_from_row).map_err(query_err)?;

        let mut stocks = Vec::new();
        for row in rows {
            stocks.push(row.map_err(query_err)?);
        }
        Ok(stocks)
    }

    fn insert_stock(&self, stock: &NewStock) -> Result<Stock, StockfolioError> {
        self.write(|tx| {
            let inserted = tx.execute(
                "INSERT INTO stock (symbol, description, quantity, unit_cost, stop_quote)
                 VALUES (?1, ?2, 0, '0', ?3)",
                params![
                    stock.symbol,
                    stock.desc,
                    stock.stop_quote.map(|q| q.to_string())
                ],
            );
            match inserted {
                Ok(_) => stock_by_id(tx, tx.last_insert_rowid()),
                Err(e) if is_unique_violation(&e) => Err(StockfolioError::DuplicateSymbol {
                    symbol: stock.symbol.clone(),
                }),
                Err(e) => Err(query_err(e)),
            }
        })
    }

    fn update_stock(&self, symbol: &str, changes: &NewStock) -> Result<Stock, StockfolioError> {
        self.write(|tx| {
            let existing = stock_by_symbol(tx, symbol)?.ok_or_else(|| {
                StockfolioError::StockNotFound {
                    symbol: symbol.to_string(),
                }
            })?;
            let updated = tx.execute(
                "UPDATE stock SET symbol = ?1, description = ?2, stop_quote = ?3 WHERE id = ?4",
                params![
                    changes.symbol,
                    changes.desc,
                    changes.stop_quote.map(|q| q.to_string()),
                    existing.id
                ],
            );
            match updated {
                Ok(_) => stock_by_id(tx, existing.id),
                Err(e) if is_unique_violation(&e) => Err(StockfolioError::DuplicateSymbol {
                    symbol: changes.symbol.clone(),
                }),
                Err(e) => Err(query_err(e)),
            }
        })
    }

    fn delete_stock(&self, symbol: &str) -> Result<Stock, StockfolioError> {
        self.write(|tx| {
            let stock = stock_by_symbol(tx, symbol)?.ok_or_else(|| {
                StockfolioError::StockNotFound {
                    symbol: symbol.to_string(),
                }
            })?;
            tx.execute("DELETE FROM positions WHERE stock_id = ?1", params![stock.id])
                .map_err(query_err)?;
            let deleted = tx
                .execute("DELETE FROM stock WHERE id = ?1", params![stock.id])
                .map_err(query_err)?;
            if deleted != 1 {
                return Err(StockfolioError::Conflict {
                    reason: format!("Error to delete stock {symbol}"),
                });
            }
            Ok(stock)
        })
    }

    fn positions_for_stock(&self, stock_id: i64) -> Result<Vec<Position>, StockfolioError> {
        self.query_positions(
            &format!("SELECT {POSITION_COLUMNS} FROM positions WHERE stock_id = ?1 ORDER BY id"),
            params![stock_id],
        )
    }

    fn list_positions(&self) -> Result<Vec<Position>, StockfolioError> {
        self.query_positions(
            &format!("SELECT {POSITION_COLUMNS} FROM positions ORDER BY id"),
            [],
        )
    }

    fn add_position(
        &self,
        symbol: &str,
        position: &NewPosition,
    ) -> Result<(Position, Stock), StockfolioError> {
        self.write(|tx| {
            let mut stock = stock_by_symbol(tx, symbol)?.ok_or_else(|| {
                StockfolioError::StockNotFound {
                    symbol: symbol.to_string(),
                }
            })?;

            tx.execute(
                "INSERT INTO positions (stock_id, quantity, position_date, unit_cost)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    stock.id,
                    position.quantity,
                    position.position_date.format("%Y-%m-%d").to_string(),
                    position.unit_cost.to_string()
                ],
            )
            .map_err(query_err)?;

            let stored = Position {
                id: tx.last_insert_rowid(),
                quantity: position.quantity,
                position_date: position.position_date,
                unit_cost: position.unit_cost,
                stock_id: stock.id,
            };
            apply_position(&mut stock, &stored)?;
            write_aggregate(tx, &stock)?;
            Ok((stored, stock))
        })
    }

    fn remove_position(&self, id: i64) -> Result<(Position, Stock), StockfolioError> {
        self.write(|tx| {
            let position = tx
                .query_row(
                    &format!("SELECT {POSITION_COLUMNS} FROM positions WHERE id = ?1"),
                    params![id],
                    position_from_row,
                )
                .optional()
                .map_err(query_err)?
                .ok_or(StockfolioError::PositionNotFound { id })?;

            let mut stock = stock_by_id(tx, position.stock_id)?;
            reverse_position(&mut stock, &position)?;
            tx.execute("DELETE FROM positions WHERE id = ?1", params![id])
                .map_err(query_err)?;
            write_aggregate(tx, &stock)?;
            Ok((position, stock))
        })
    }

    fn get_cash(&self) -> Result<Option<Cash>, StockfolioError> {
        let conn = self.conn()?;
        let balance: Option<String> = conn
            .query_row(
                "SELECT balance FROM cash WHERE id = ?1",
                params![CASH_ID],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_err)?;
        balance
            .map(|b| parse_decimal(0, &b).map(Cash::new).map_err(query_err))
            .transpose()
    }

    fn insert_cash(&self, balance: Decimal) -> Result<Cash, StockfolioError> {
        self.write(|tx| {
            let inserted = tx.execute(
                "INSERT INTO cash (id, balance) VALUES (?1, ?2)",
                params![CASH_ID, balance.to_string()],
            );
            match inserted {
                Ok(_) => Ok(Cash::new(balance)),
                Err(e) if is_unique_violation(&e) => Err(StockfolioError::CashExists),
                Err(e) => Err(query_err(e)),
            }
        })
    }

    fn upsert_cash(&self, balance: Decimal) -> Result<Cash, StockfolioError> {
        self.write(|tx| {
            tx.execute(
                "INSERT INTO cash (id, balance) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET balance = excluded.balance",
                params![CASH_ID, balance.to_string()],
            )
            .map_err(query_err)?;
            Ok(Cash::new(balance))
        })
    }

    fn delete_cash(&self) -> Result<Cash, StockfolioError> {
        self.write(|tx| {
            let balance: Option<String> = tx
                .query_row(
                    "SELECT balance FROM cash WHERE id = ?1",
                    params![CASH_ID],
                    |row| row.get(0),
                )
                .optional()
                .map_err(query_err)?;
            let balance = balance.ok_or(StockfolioError::CashNotFound)?;
            tx.execute("DELETE FROM cash WHERE id = ?1", params![CASH_ID])
                .map_err(query_err)?;
            Ok(Cash::new(parse_decimal(0, &balance).map_err(query_err)?))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
    }

    fn adapter() -> SqliteAdapter {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        adapter
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lot(quantity: i64, unit_cost: Decimal) -> NewPosition {
        NewPosition {
            position_date: date(2024, 1, 1),
            quantity,
            unit_cost,
        }
    }

    #[test]
    fn from_config_missing_path() {
        let config = EmptyConfig;
        let result = SqliteAdapter::from_config(&config);
        match result {
            Err(StockfolioError::ConfigMissing { section, key }) => {
                assert_eq!(section, "sqlite");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let adapter = adapter();
        adapter.initialize_schema().unwrap();
    }

    #[test]
    fn insert_and_find_stock() {
        let adapter = adapter();
        let stock = adapter
            .insert_stock(&NewStock::new("AAPL", "Apple Inc", Some(dec!(120.50))))
            .unwrap();
        assert_eq!(stock.quantity, 0);
        assert_eq!(stock.unit_cost, Decimal::ZERO);

        let found = adapter.find_stock("AAPL").unwrap().unwrap();
        assert_eq!(found, stock);
        assert_eq!(found.stop_quote, Some(dec!(120.50)));
        assert!(adapter.find_stock("MSFT").unwrap().is_none());
    }

    #[test]
    fn duplicate_symbol_is_reported_not_raised() {
        let adapter = adapter();
        adapter
            .insert_stock(&NewStock::new("AAPL", "Apple Inc", None))
            .unwrap();
        let err = adapter
            .insert_stock(&NewStock::new("AAPL", "Again", None))
            .unwrap_err();
        assert!(matches!(err, StockfolioError::DuplicateSymbol { symbol } if symbol == "AAPL"));
        assert_eq!(adapter.list_stocks().unwrap().len(), 1);
    }

    #[test]
    fn rename_onto_existing_symbol_fails() {
        let adapter = adapter();
        adapter
            .insert_stock(&NewStock::new("AAPL", "Apple Inc", None))
            .unwrap();
        adapter
            .insert_stock(&NewStock::new("MSFT", "Microsoft", None))
            .unwrap();
        let err = adapter
            .update_stock("MSFT", &NewStock::new("AAPL", "Clash", None))
            .unwrap_err();
        assert!(matches!(err, StockfolioError::DuplicateSymbol { .. }));
        assert_eq!(adapter.find_stock("MSFT").unwrap().unwrap().desc, "Microsoft");
    }

    #[test]
    fn positions_update_aggregate_in_one_write() {
        let adapter = adapter();
        adapter
            .insert_stock(&NewStock::new("AAPL", "Apple Inc", None))
            .unwrap();

        let (first, stock) = adapter.add_position("AAPL", &lot(10, dec!(100.00))).unwrap();
        assert_eq!((stock.quantity, stock.unit_cost), (10, dec!(100.00)));
        let (_, stock) = adapter.add_position("AAPL", &lot(10, dec!(200.00))).unwrap();
        assert_eq!((stock.quantity, stock.unit_cost), (20, dec!(150.00)));

        let (removed, stock) = adapter.remove_position(first.id).unwrap();
        assert_eq!(removed, first);
        assert_eq!((stock.quantity, stock.unit_cost), (10, dec!(200.00)));
        assert_eq!(adapter.find_stock("AAPL").unwrap().unwrap(), stock);
    }

    #[test]
    fn position_for_missing_stock_writes_nothing() {
        let adapter = adapter();
        let err = adapter.add_position("NOPE", &lot(1, dec!(1.00))).unwrap_err();
        assert!(matches!(err, StockfolioError::StockNotFound { .. }));
        assert!(adapter.list_positions().unwrap().is_empty());
    }

    #[test]
    fn failed_recompute_rolls_back_position_delete() {
        let adapter = adapter();
        adapter
            .insert_stock(&NewStock::new("AAPL", "Apple Inc", None))
            .unwrap();
        let (position, _) = adapter.add_position("AAPL", &lot(5, dec!(10.00))).unwrap();

        // Corrupt the aggregate so reversing the lot would oversell.
        adapter
            .conn()
            .unwrap()
            .execute("UPDATE stock SET quantity = 1", [])
            .unwrap();

        let err = adapter.remove_position(position.id).unwrap_err();
        assert!(matches!(err, StockfolioError::CostBasis(_)));
        assert_eq!(adapter.list_positions().unwrap(), vec![position]);
    }

    #[test]
    fn deleting_stock_cascades() {
        let adapter = adapter();
        adapter
            .insert_stock(&NewStock::new("AAPL", "Apple Inc", None))
            .unwrap();
        adapter.add_position("AAPL", &lot(5, dec!(10.00))).unwrap();
        adapter.add_position("AAPL", &lot(5, dec!(12.00))).unwrap();

        let deleted = adapter.delete_stock("AAPL").unwrap();
        assert_eq!(deleted.quantity, 10);
        assert!(adapter.list_positions().unwrap().is_empty());
        assert!(matches!(
            adapter.delete_stock("AAPL"),
            Err(StockfolioError::StockNotFound { .. })
        ));
    }

    #[test]
    fn missing_position_is_not_found() {
        let adapter = adapter();
        assert!(matches!(
            adapter.remove_position(99),
            Err(StockfolioError::PositionNotFound { id: 99 })
        ));
    }

    #[test]
    fn cash_is_a_single_row() {
        let adapter = adapter();
        assert!(adapter.get_cash().unwrap().is_none());

        adapter.insert_cash(dec!(100.00)).unwrap();
        assert!(matches!(
            adapter.insert_cash(dec!(5.00)),
            Err(StockfolioError::CashExists)
        ));

        adapter.upsert_cash(dec!(250.75)).unwrap();
        adapter.upsert_cash(dec!(250.75)).unwrap();
        let count: i64 = adapter
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM cash", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(adapter.get_cash().unwrap(), Some(Cash::new(dec!(250.75))));

        assert_eq!(adapter.delete_cash().unwrap().balance, dec!(250.75));
        assert!(matches!(adapter.delete_cash(), Err(StockfolioError::CashNotFound)));
    }

    #[test]
    fn file_backed_pool_shares_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockfolio.db");
        let adapter = SqliteAdapter::from_config(&PathConfig(path.display().to_string())).unwrap();
        adapter.initialize_schema().unwrap();
        adapter
            .insert_stock(&NewStock::new("IBM", "International Business", None))
            .unwrap();

        let reopened = SqliteAdapter::from_config(&PathConfig(path.display().to_string())).unwrap();
        assert!(reopened.find_stock("IBM").unwrap().is_some());
    }

    struct PathConfig(String);

    impl ConfigPort for PathConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            match (section, key) {
                ("sqlite", "path") => Some(self.0.clone()),
                _ => None,
            }
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
    }
}
