//! PostgreSQL storage adapter.

use crate::domain::cash::{CASH_ID, Cash};
use crate::domain::cost_basis::{apply_position, reverse_position};
use crate::domain::error::StockfolioError;
use crate::domain::position::{NewPosition, Position};
use crate::domain::stock::{NewStock, Stock};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;
use postgres::error::SqlState;
use postgres::{NoTls, Row, Transaction};
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;
use rust_decimal::Decimal;
use tracing::error;

type Manager = PostgresConnectionManager<NoTls>;

const STOCK_COLUMNS: &str = "id, symbol, description, quantity, unit_cost, stop_quote";
const POSITION_COLUMNS: &str = "id, quantity, position_date, unit_cost, stock_id";

pub struct PostgresAdapter {
    pool: Pool<Manager>,
}

fn db_err(e: r2d2::Error) -> StockfolioError {
    error!(error = %e, "postgres pool error");
    StockfolioError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: postgres::Error) -> StockfolioError {
    error!(error = %e, "postgres query error");
    StockfolioError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn is_unique_violation(e: &postgres::Error) -> bool {
    e.code() == Some(&SqlState::UNIQUE_VIOLATION)
}

fn stock_from_row(row: &Row) -> Stock {
    Stock {
        id: row.get(0),
        symbol: row.get(1),
        desc: row.get(2),
        quantity: row.get(3),
        unit_cost: row.get(4),
        stop_quote: row.get(5),
    }
}

fn position_from_row(row: &Row) -> Position {
    Position {
        id: row.get(0),
        quantity: row.get(1),
        position_date: row.get(2),
        unit_cost: row.get(3),
        stock_id: row.get(4),
    }
}

/// Load and lock the stock row for the rest of the transaction.
fn lock_stock(tx: &mut Transaction<'_>, symbol: &str) -> Result<Stock, StockfolioError> {
    tx.query_opt(
        &format!("SELECT {STOCK_COLUMNS} FROM stock WHERE symbol = $1 FOR UPDATE"),
        &[&symbol],
    )
    .map_err(query_err)?
    .map(|row| stock_from_row(&row))
    .ok_or_else(|| StockfolioError::StockNotFound {
        symbol: symbol.to_string(),
    })
}

fn write_aggregate(tx: &mut Transaction<'_>, stock: &Stock) -> Result<(), StockfolioError> {
    tx.execute(
        "UPDATE stock SET quantity = $1, unit_cost = $2 WHERE id = $3",
        &[&stock.quantity, &stock.unit_cost, &stock.id],
    )
    .map_err(query_err)?;
    Ok(())
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockfolioError> {
        let connection_string = config
            .get_string("postgres", "connection_string")
            .ok_or_else(|| StockfolioError::ConfigMissing {
                section: "postgres".into(),
                key: "connection_string".into(),
            })?;

        let pg_config = connection_string
            .parse::<postgres::Config>()
            .map_err(|e| StockfolioError::ConfigInvalid {
                section: "postgres".into(),
                key: "connection_string".into(),
                reason: e.to_string(),
            })?;

        let pool_size = config.get_int("postgres", "pool_size", 4) as u32;
        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<Manager>, StockfolioError> {
        self.pool.get().map_err(db_err)
    }

    /// Run `f` in a transaction, committing only when it succeeds.
    fn write<T>(
        &self,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<T, StockfolioError>,
    ) -> Result<T, StockfolioError> {
        let mut conn = self.conn()?;
        let mut tx = conn.transaction().map_err(query_err)?;
        let value = f(&mut tx)?;
        tx.commit().map_err(query_err)?;
        Ok(value)
    }
}

impl StorePort for PostgresAdapter {
    fn initialize_schema(&self) -> Result<(), StockfolioError> {
        self.conn()?
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS stock (
                    id BIGSERIAL PRIMARY KEY,
                    symbol VARCHAR(5) NOT NULL UNIQUE,
                    description VARCHAR(30) NOT NULL,
                    quantity BIGINT NOT NULL DEFAULT 0,
                    unit_cost NUMERIC(14, 2) NOT NULL DEFAULT 0,
                    stop_quote NUMERIC(14, 2)
                );
                CREATE TABLE IF NOT EXISTS positions (
                    id BIGSERIAL PRIMARY KEY,
                    stock_id BIGINT NOT NULL REFERENCES stock(id) ON DELETE CASCADE,
                    quantity BIGINT NOT NULL,
                    position_date DATE NOT NULL,
                    unit_cost NUMERIC(14, 2) NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_positions_stock_id ON positions(stock_id);
                CREATE TABLE IF NOT EXISTS cash (
                    id BIGINT PRIMARY KEY CHECK (id = 1),
                    balance NUMERIC(14, 2) NOT NULL
                );",
            )
            .map_err(query_err)
    }

    fn find_stock(&self, symbol: &str) -> Result<Option<Stock>, StockfolioError> {
        let row = self
            .conn()?
            .query_opt(
                &format!("SELECT {STOCK_COLUMNS} FROM stock WHERE symbol = $1"),
                &[&symbol],
            )
            .map_err(query_err)?;
        Ok(row.map(|r| stock_from_row(&r)))
    }

    fn list_stocks(&self) -> Result<Vec<Stock>, StockfolioError> {
        let rows = self
            .conn()?
            .query(&format!("SELECT {STOCK_COLUMNS} FROM stock ORDER BY id"), &[])
            .map_err(query_err)?;
        Ok(rows.iter().map(stock_from_row).collect())
    }

    fn insert_stock(&self, stock: &NewStock) -> Result<Stock, StockfolioError> {
        self.write(|tx| {
            let inserted = tx.query_one(
                &format!(
                    "INSERT INTO stock (symbol, description, stop_quote) VALUES ($1, $2, $3)
                     RETURNING {STOCK_COLUMNS}"
                ),
                &[&stock.symbol, &stock.desc, &stock.stop_quote],
            );
            match inserted {
                Ok(row) => Ok(stock_from_row(&row)),
                Err(e) if is_unique_violation(&e) => Err(StockfolioError::DuplicateSymbol {
                    symbol: stock.symbol.clone(),
                }),
                Err(e) => Err(query_err(e)),
            }
        })
    }

    fn update_stock(&self, symbol: &str, changes: &NewStock) -> Result<Stock, StockfolioError> {
        self.write(|tx| {
            let existing = lock_stock(tx, symbol)?;
            let updated = tx.query_one(
                &format!(
                    "UPDATE stock SET symbol = $1, description = $2, stop_quote = $3 WHERE id = $4
                     RETURNING {STOCK_COLUMNS}"
                ),
                &[&changes.symbol, &changes.desc, &changes.stop_quote, &existing.id],
            );
            match updated {
                Ok(row) => Ok(stock_from_row(&row)),
                Err(e) if is_unique_violation(&e) => Err(StockfolioError::DuplicateSymbol {
                    symbol: changes.symbol.clone(),
                }),
                Err(e) => Err(query_err(e)),
            }
        })
    }

    fn delete_stock(&self, symbol: &str) -> Result<Stock, StockfolioError> {
        self.write(|tx| {
            let stock = lock_stock(tx, symbol)?;
            tx.execute("DELETE FROM positions WHERE stock_id = $1", &[&stock.id])
                .map_err(query_err)?;
            let deleted = tx
                .execute("DELETE FROM stock WHERE id = $1", &[&stock.id])
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
        let rows = self
            .conn()?
            .query(
                &format!(
                    "SELECT {POSITION_COLUMNS} FROM positions WHERE stock_id = $1 ORDER BY id"
                ),
                &[&stock_id],
            )
            .map_err(query_err)?;
        Ok(rows.iter().map(position_from_row).collect())
    }

    fn list_positions(&self) -> Result<Vec<Position>, StockfolioError> {
        let rows = self
            .conn()?
            .query(
                &format!("SELECT {POSITION_COLUMNS} FROM positions ORDER BY id"),
                &[],
            )
            .map_err(query_err)?;
        Ok(rows.iter().map(position_from_row).collect())
    }

    fn add_position(
        &self,
        symbol: &str,
        position: &NewPosition,
    ) -> Result<(Position, Stock), StockfolioError> {
        self.write(|tx| {
            let mut stock = lock_stock(tx, symbol)?;
            let row = tx
                .query_one(
                    &format!(
                        "INSERT INTO positions (stock_id, quantity, position_date, unit_cost)
                         VALUES ($1, $2, $3, $4) RETURNING {POSITION_COLUMNS}"
                    ),
                    &[
                        &stock.id,
                        &position.quantity,
                        &position.position_date,
                        &position.unit_cost,
                    ],
                )
                .map_err(query_err)?;
            let stored = position_from_row(&row);
            apply_position(&mut stock, &stored)?;
            write_aggregate(tx, &stock)?;
            Ok((stored, stock))
        })
    }

    fn remove_position(&self, id: i64) -> Result<(Position, Stock), StockfolioError> {
        self.write(|tx| {
            let position = tx
                .query_opt(
                    &format!("SELECT {POSITION_COLUMNS} FROM positions WHERE id = $1"),
                    &[&id],
                )
                .map_err(query_err)?
                .map(|row| position_from_row(&row))
                .ok_or(StockfolioError::PositionNotFound { id })?;

            let mut stock = tx
                .query_one(
                    &format!("SELECT {STOCK_COLUMNS} FROM stock WHERE id = $1 FOR UPDATE"),
                    &[&position.stock_id],
                )
                .map(|row| stock_from_row(&row))
                .map_err(query_err)?;
            reverse_position(&mut stock, &position)?;
            tx.execute("DELETE FROM positions WHERE id = $1", &[&id])
                .map_err(query_err)?;
            write_aggregate(tx, &stock)?;
            Ok((position, stock))
        })
    }

    fn get_cash(&self) -> Result<Option<Cash>, StockfolioError> {
        let row = self
            .conn()?
            .query_opt("SELECT balance FROM cash WHERE id = $1", &[&CASH_ID])
            .map_err(query_err)?;
        Ok(row.map(|r| Cash::new(r.get::<_, Decimal>(0))))
    }

    fn insert_cash(&self, balance: Decimal) -> Result<Cash, StockfolioError> {
        self.write(|tx| {
            match tx.execute(
                "INSERT INTO cash (id, balance) VALUES ($1, $2)",
                &[&CASH_ID, &balance],
            ) {
                Ok(_) => Ok(Cash::new(balance)),
                Err(e) if is_unique_violation(&e) => Err(StockfolioError::CashExists),
                Err(e) => Err(query_err(e)),
            }
        })
    }

    fn upsert_cash(&self, balance: Decimal) -> Result<Cash, StockfolioError> {
        self.write(|tx| {
            tx.execute(
                "INSERT INTO cash (id, balance) VALUES ($1, $2)
                 ON CONFLICT (id) DO UPDATE SET balance = EXCLUDED.balance",
                &[&CASH_ID, &balance],
            )
            .map_err(query_err)?;
            Ok(Cash::new(balance))
        })
    }

    fn delete_cash(&self) -> Result<Cash, StockfolioError> {
        self.write(|tx| {
            tx.query_opt(
                "DELETE FROM cash WHERE id = $1 RETURNING balance",
                &[&CASH_ID],
            )
            .map_err(query_err)?
            .map(|row| Cash::new(row.get::<_, Decimal>(0)))
            .ok_or(StockfolioError::CashNotFound)
        })
    }
}
