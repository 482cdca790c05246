//! Shared checklist item store.
//!
//! # Responsibility
//! - Own the single SQLite connection for the process.
//! - Expose item CRUD, bulk mutations and snapshot reads as atomic units.
//! - Translate storage faults into a small, cloneable error taxonomy.
//!
//! # Invariants
//! - Every operation runs inside one critical section on the connection;
//!   writes additionally run inside one `IMMEDIATE` transaction.
//! - Readers never observe a partially applied bulk mutation.
//! - Operations on missing ids succeed without changing anything.
//! - Returned items are copies; nothing hands out access to the connection.

use crate::db::{ensure_items_schema, open_db, open_db_in_memory, DbError};
use crate::model::item::{ChecklistItem, ItemId};
use crate::repo::item_repo::{
    ItemCounts, ItemRepository, RepoError, RepoResult, SqliteItemRepository,
};
use log::{debug, warn};
use rusqlite::{Connection, ErrorCode, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure category surfaced to store callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    PersistenceUnavailable,
    PersistenceCorrupt,
    InvalidDescription,
}

/// Store-level error.
///
/// Messages are diagnostic only and never contain item descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backing database cannot be opened, read or written.
    PersistenceUnavailable(String),
    /// Backing database content is unreadable.
    PersistenceCorrupt(String),
    /// Caller passed an empty description.
    InvalidDescription,
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            Self::PersistenceUnavailable(_) => StoreErrorKind::PersistenceUnavailable,
            Self::PersistenceCorrupt(_) => StoreErrorKind::PersistenceCorrupt,
            Self::InvalidDescription => StoreErrorKind::InvalidDescription,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::PersistenceUnavailable(_) => "persistence_unavailable",
            Self::PersistenceCorrupt(_) => "persistence_corrupt",
            Self::InvalidDescription => "invalid_description",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PersistenceUnavailable(details) => {
                write!(f, "item storage unavailable: {details}")
            }
            Self::PersistenceCorrupt(details) => write!(f, "item storage corrupt: {details}"),
            Self::InvalidDescription => write!(f, "item description cannot be empty"),
        }
    }
}

impl Error for StoreError {}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => classify_sqlite(err),
            other @ DbError::UnsupportedSchemaVersion { .. } => {
                Self::PersistenceUnavailable(other.to_string())
            }
            other @ (DbError::MissingTable(_) | DbError::MissingColumn { .. }) => {
                Self::PersistenceCorrupt(other.to_string())
            }
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        classify_sqlite(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(_) => Self::InvalidDescription,
            RepoError::Db(err) => err.into(),
            RepoError::InvalidData(message) => Self::PersistenceCorrupt(message),
        }
    }
}

fn classify_sqlite(err: rusqlite::Error) -> StoreError {
    let corrupt = match &err {
        rusqlite::Error::SqliteFailure(failure, _) => matches!(
            failure.code,
            ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase
        ),
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => true,
        _ => false,
    };

    if corrupt {
        StoreError::PersistenceCorrupt(err.to_string())
    } else {
        StoreError::PersistenceUnavailable(err.to_string())
    }
}

/// Number of rows a write touched, used for diagnostics.
trait WriteEffect {
    fn changed(&self) -> usize;
}

impl WriteEffect for bool {
    fn changed(&self) -> usize {
        usize::from(*self)
    }
}

impl WriteEffect for usize {
    fn changed(&self) -> usize {
        *self
    }
}

impl WriteEffect for ItemId {
    fn changed(&self) -> usize {
        1
    }
}

/// Process-wide handle to the checklist database.
///
/// Clones share one connection. Create it once at startup and pass clones
/// to every consumer instead of reopening the file.
#[derive(Clone)]
pub struct ItemStore {
    conn: Arc<Mutex<Connection>>,
}

impl ItemStore {
    /// Opens (or creates) the database file and applies migrations.
    ///
    /// Failing here leaves the process without item storage; callers
    /// treat it as fatal.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = open_db(path)?;
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = open_db_in_memory()?;
        Self::from_connection(conn)
    }

    /// Wraps an already migrated connection.
    ///
    /// # Errors
    /// - `PersistenceCorrupt` when the `items` table or one of its columns
    ///   is missing.
    pub fn from_connection(conn: Connection) -> StoreResult<Self> {
        ensure_items_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Adds a new unchecked item and returns its id.
    ///
    /// Ids grow strictly and are never handed out twice, even after the
    /// newest item is deleted.
    pub fn insert(&self, description: &str) -> StoreResult<ItemId> {
        self.write("insert", |repo| repo.insert_item(description))
    }

    /// Replaces the description of `id`. Returns `false` if it does not exist.
    pub fn edit(&self, id: ItemId, description: &str) -> StoreResult<bool> {
        self.write("edit", |repo| repo.update_description(id, description))
    }

    /// Replaces description and checked state from a full snapshot.
    ///
    /// Returns `false` if the item was deleted in the meantime.
    pub fn update(&self, item: &ChecklistItem) -> StoreResult<bool> {
        self.write("update", |repo| repo.update_item(item))
    }

    /// Toggles `checked` on `id`. Returns `false` if it does not exist.
    pub fn flip(&self, id: ItemId) -> StoreResult<bool> {
        self.write("flip", |repo| repo.flip_item(id))
    }

    /// Removes `id` permanently. Returns `false` if it does not exist.
    pub fn delete(&self, id: ItemId) -> StoreResult<bool> {
        self.write("delete", |repo| repo.delete_item(id))
    }

    /// Removes every checked item in one transaction.
    pub fn delete_checked(&self) -> StoreResult<usize> {
        self.write("delete_checked", |repo| repo.delete_checked())
    }

    /// Marks every item checked in one transaction.
    pub fn check_all(&self) -> StoreResult<usize> {
        self.write("check_all", |repo| repo.set_all_checked(true))
    }

    /// Marks every item unchecked in one transaction.
    pub fn uncheck_all(&self) -> StoreResult<usize> {
        self.write("uncheck_all", |repo| repo.set_all_checked(false))
    }

    /// Inverts `checked` on every item in one transaction.
    pub fn flip_all(&self) -> StoreResult<usize> {
        self.write("flip_all", |repo| repo.flip_all())
    }

    /// Returns a snapshot of every item ordered by ascending id.
    pub fn fetch_all(&self) -> StoreResult<Vec<ChecklistItem>> {
        self.read("fetch_all", |repo| repo.list_items())
    }

    /// Returns a snapshot of one item, or `None` if it does not exist.
    pub fn get(&self, id: ItemId) -> StoreResult<Option<ChecklistItem>> {
        self.read("get", |repo| repo.get_item(id))
    }

    /// Returns total and checked item counts from one consistent read.
    pub fn count(&self) -> StoreResult<ItemCounts> {
        self.read("count", |repo| repo.count_items())
    }

    /// Enters the store's critical section.
    ///
    /// A panic while the lock was held leaves no partial write behind: the
    /// open transaction rolls back when it is dropped during unwinding. The
    /// poison flag is therefore cleared and the store keeps serving calls.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("event=store_lock module=store status=recovered error_code=lock_poisoned");
            self.conn.clear_poison();
            poisoned.into_inner()
        })
    }

    fn write<T: WriteEffect>(
        &self,
        op: &'static str,
        f: impl FnOnce(&SqliteItemRepository<'_>) -> RepoResult<T>,
    ) -> StoreResult<T> {
        let started_at = Instant::now();
        let result = (|| -> StoreResult<T> {
            let mut conn = self.lock();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let value = f(&SqliteItemRepository::new(&tx))?;
            tx.commit()?;
            Ok(value)
        })();

        match &result {
            Ok(value) => debug!(
                "event=store_write module=store status=ok op={} changed={} duration_ms={}",
                op,
                value.changed(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=store_write module=store status=error op={} duration_ms={} error_code={} error={}",
                op,
                started_at.elapsed().as_millis(),
                err.error_code(),
                err
            ),
        }
        result
    }

    fn read<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&SqliteItemRepository<'_>) -> RepoResult<T>,
    ) -> StoreResult<T> {
        let started_at = Instant::now();
        let conn = self.lock();
        let result = f(&SqliteItemRepository::new(&conn)).map_err(StoreError::from);
        drop(conn);

        match &result {
            Ok(_) => debug!(
                "event=store_fetch module=store status=ok op={} duration_ms={}",
                op,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=store_fetch module=store status=error op={} duration_ms={} error_code={} error={}",
                op,
                started_at.elapsed().as_millis(),
                err.error_code(),
                err
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::{ItemStore, StoreError, StoreErrorKind};
    use crate::db::DbError;
    use crate::model::item::ItemValidationError;
    use crate::repo::item_repo::RepoError;
    use rusqlite::Connection;
    use std::thread;

    #[test]
    fn validation_errors_map_to_invalid_description() {
        let err = StoreError::from(RepoError::Validation(ItemValidationError::EmptyDescription));
        assert_eq!(err.kind(), StoreErrorKind::InvalidDescription);
    }

    #[test]
    fn invalid_rows_map_to_corrupt() {
        let err = StoreError::from(RepoError::InvalidData("bad row".to_string()));
        assert_eq!(err.kind(), StoreErrorKind::PersistenceCorrupt);
    }

    #[test]
    fn newer_schema_maps_to_unavailable() {
        let err = StoreError::from(DbError::UnsupportedSchemaVersion {
            db_version: 9,
            latest_supported: 1,
        });
        assert_eq!(err.kind(), StoreErrorKind::PersistenceUnavailable);
    }

    #[test]
    fn rejected_insert_leaves_store_usable() {
        let store = ItemStore::open_in_memory().unwrap();
        assert_eq!(store.insert("   ").unwrap_err(), StoreError::InvalidDescription);

        let id = store.insert("apples").unwrap();
        let items = store.fetch_all().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, id);
    }

    #[test]
    fn panic_inside_critical_section_does_not_disable_store() {
        let store = ItemStore::open_in_memory().unwrap();
        store.insert("kept").unwrap();

        let poisoner = store.clone();
        let joined = thread::spawn(move || {
            let mut conn = poisoner.lock();
            let tx = conn.transaction().unwrap();
            tx.execute("INSERT INTO items (description) VALUES ('lost');", [])
                .unwrap();
            panic!("simulated failure mid-transaction");
        })
        .join();
        assert!(joined.is_err());

        let descriptions: Vec<String> = store
            .fetch_all()
            .unwrap()
            .into_iter()
            .map(|item| item.description)
            .collect();
        assert_eq!(descriptions, vec!["kept"]);
        store.insert("after recovery").unwrap();
        assert_eq!(store.count().unwrap().total, 2);
    }

    #[test]
    fn from_connection_rejects_connection_without_items_table() {
        let conn = Connection::open_in_memory().unwrap();
        let err = ItemStore::from_connection(conn).err().unwrap();
        assert_eq!(err.kind(), StoreErrorKind::PersistenceCorrupt);
    }
}
