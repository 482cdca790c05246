//! SQLite storage bootstrap for the checklist database.
//!
//! # Responsibility
//! - Open the single connection behind `ItemStore` and bring `items` up to date.
//! - Confirm a handed-in connection actually carries the `items` schema.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Items are never read or written before `ensure_items_schema` passes.

use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Columns every item row must have, in storage order.
pub const ITEM_COLUMNS: [&str; 3] = ["id", "description", "checked"];

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// The connection has no `items` table.
    MissingTable(&'static str),
    /// `items` exists but lacks one of [`ITEM_COLUMNS`].
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "checklist schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::MissingTable(table) => write!(f, "checklist table `{table}` is missing"),
            Self::MissingColumn { table, column } => {
                write!(f, "checklist table `{table}` has no `{column}` column")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Checks that `conn` has an `items` table with every column in [`ITEM_COLUMNS`].
pub fn ensure_items_schema(conn: &Connection) -> DbResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'items'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(DbError::MissingTable("items"));
    }

    let mut stmt = conn.prepare("PRAGMA table_info(items);")?;
    let present = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    for column in ITEM_COLUMNS {
        if !present.iter().any(|name| name == column) {
            return Err(DbError::MissingColumn {
                table: "items",
                column,
            });
        }
    }

    Ok(())
}
