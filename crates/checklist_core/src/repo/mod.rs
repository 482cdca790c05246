//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract for checklist items.
//! - Isolate SQLite query details from the shared store handle.
//!
//! # Invariants
//! - Repository writes validate item content before persistence.
//! - Repository APIs never own a connection; the caller picks the
//!   connection or transaction they run against.

pub mod item_repo;
