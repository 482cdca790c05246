//! Checklist schema migrations.
//!
//! # Invariants
//! - `version` values are strictly increasing, starting at 1.
//! - The applied version is mirrored to `PRAGMA user_version`.
//! - `items.id` comes from `AUTOINCREMENT`, so ids are never handed out twice.
//! - `items.checked` only ever holds `0` or `1`.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "create_items",
    sql: include_str!("0001_init.sql"),
}];

/// Latest checklist schema version this binary can read.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings the checklist schema up to [`latest_version`] in one transaction.
///
/// Returns the number of migrations applied, `0` when already current.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file was written by a newer build.
///   Nothing is touched in that case.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let current = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    let latest = latest_version();

    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current)
        .collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for migration in &pending {
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    Ok(pending.len())
}
