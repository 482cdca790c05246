//! Item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and bulk-mutation SQL over the `items` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths validate descriptions before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Missing ids are reported as "nothing changed", never as errors.
//! - Bulk mutations are one statement each; callers wrap them in a
//!   transaction to get snapshot-consistent visibility.

use crate::db::DbError;
use crate::model::item::{validate_description, ChecklistItem, ItemId, ItemValidationError};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ITEM_SELECT_SQL: &str = "SELECT
    id,
    description,
    checked
FROM items";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for item persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ItemValidationError),
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Item totals read in one statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemCounts {
    pub total: usize,
    pub checked: usize,
}

/// Repository interface for checklist items.
///
/// Single-item mutations return `true` when a row was touched; bulk
/// mutations return the number of affected rows.
pub trait ItemRepository {
    fn insert_item(&self, description: &str) -> RepoResult<ItemId>;
    fn update_description(&self, id: ItemId, description: &str) -> RepoResult<bool>;
    fn update_item(&self, item: &ChecklistItem) -> RepoResult<bool>;
    fn flip_item(&self, id: ItemId) -> RepoResult<bool>;
    fn delete_item(&self, id: ItemId) -> RepoResult<bool>;
    fn delete_checked(&self) -> RepoResult<usize>;
    fn set_all_checked(&self, checked: bool) -> RepoResult<usize>;
    fn flip_all(&self) -> RepoResult<usize>;
    fn get_item(&self, id: ItemId) -> RepoResult<Option<ChecklistItem>>;
    fn list_items(&self) -> RepoResult<Vec<ChecklistItem>>;
    fn count_items(&self) -> RepoResult<ItemCounts>;
}

/// SQLite-backed item repository.
///
/// Borrows either a plain connection or an open transaction (which derefs
/// to `Connection`), so the caller decides the atomicity boundary.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn insert_item(&self, description: &str) -> RepoResult<ItemId> {
        validate_description(description)?;

        self.conn.execute(
            "INSERT INTO items (description, checked) VALUES (?1, 0);",
            [description],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_description(&self, id: ItemId, description: &str) -> RepoResult<bool> {
        validate_description(description)?;

        let changed = self.conn.execute(
            "UPDATE items SET description = ?1 WHERE id = ?2;",
            params![description, id],
        )?;
        Ok(changed > 0)
    }

    fn update_item(&self, item: &ChecklistItem) -> RepoResult<bool> {
        item.validate()?;

        let changed = self.conn.execute(
            "UPDATE items SET description = ?1, checked = ?2 WHERE id = ?3;",
            params![item.description.as_str(), bool_to_int(item.checked), item.id],
        )?;
        Ok(changed > 0)
    }

    fn flip_item(&self, id: ItemId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE items SET checked = 1 - checked WHERE id = ?1;",
            [id],
        )?;
        Ok(changed > 0)
    }

    fn delete_item(&self, id: ItemId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM items WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn delete_checked(&self) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM items WHERE checked = 1;", [])?;
        Ok(changed)
    }

    fn set_all_checked(&self, checked: bool) -> RepoResult<usize> {
        // Rows already in the target state are skipped so the count reflects
        // actual changes.
        let changed = self.conn.execute(
            "UPDATE items SET checked = ?1 WHERE checked <> ?1;",
            [bool_to_int(checked)],
        )?;
        Ok(changed)
    }

    fn flip_all(&self) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("UPDATE items SET checked = 1 - checked;", [])?;
        Ok(changed)
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<ChecklistItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }

        Ok(None)
    }

    fn list_items(&self) -> RepoResult<Vec<ChecklistItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();

        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }

        Ok(items)
    }

    fn count_items(&self) -> RepoResult<ItemCounts> {
        let (total, checked) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(checked), 0) FROM items;",
            [],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;

        Ok(ItemCounts {
            total: count_to_usize(total, "total")?,
            checked: count_to_usize(checked, "checked")?,
        })
    }
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<ChecklistItem> {
    let id: ItemId = row.get("id")?;
    let checked = match row.get::<_, i64>("checked")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid checked value `{other}` in items.checked for id {id}"
            )));
        }
    };

    let item = ChecklistItem {
        id,
        description: row.get("description")?,
        checked,
    };
    item.validate().map_err(|err| {
        RepoError::InvalidData(format!("{err} (items.description for id {id})"))
    })?;
    Ok(item)
}

fn count_to_usize(value: i64, label: &str) -> RepoResult<usize> {
    usize::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative {label} item count `{value}`")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::{ItemRepository, RepoError, SqliteItemRepository};
    use crate::db::open_db_in_memory;

    #[test]
    fn set_all_checked_counts_only_changed_rows() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteItemRepository::new(&conn);
        let first = repo.insert_item("bread").unwrap();
        repo.insert_item("butter").unwrap();
        repo.flip_item(first).unwrap();

        assert_eq!(repo.set_all_checked(true).unwrap(), 1);
        assert_eq!(repo.set_all_checked(true).unwrap(), 0);
        assert_eq!(repo.set_all_checked(false).unwrap(), 2);
    }

    #[test]
    fn corrupt_checked_value_is_reported_as_invalid_data() {
        let conn = open_db_in_memory().unwrap();
        // Bypass the CHECK constraint to simulate a damaged row.
        conn.execute_batch(
            "PRAGMA ignore_check_constraints = ON;
             INSERT INTO items (description, checked) VALUES ('broken', 7);",
        )
        .unwrap();

        let repo = SqliteItemRepository::new(&conn);
        let err = repo.list_items().unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(message) if message.contains("checked")));
    }

    #[test]
    fn count_items_on_empty_table_is_zero() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteItemRepository::new(&conn);
        let counts = repo.count_items().unwrap();
        assert_eq!(counts.total, 0);
        assert_eq!(counts.checked, 0);
    }
}
