//! Core logic for the checklist manager.
//! This crate is the single source of truth for item storage invariants.

pub mod db;
pub mod loader;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use loader::background::{BackgroundLoader, LoadResult};
pub use loader::notify::{
    notify_channel, NotifyContext, NotifyQueue, NotifySender, NotifyTask,
};
pub use loader::write_queue::{WriteCommand, WriteOutcome, WriteQueue};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::item::{ChecklistItem, ItemId, ItemValidationError};
pub use repo::item_repo::{
    ItemCounts, ItemRepository, RepoError, RepoResult, SqliteItemRepository,
};
pub use service::item_store::{ItemStore, StoreError, StoreErrorKind, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
