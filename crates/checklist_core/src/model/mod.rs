//! Checklist domain model.
//!
//! # Responsibility
//! - Define the canonical item record shared by store, loader and callers.
//!
//! # Invariants
//! - Every item is identified by a store-assigned `ItemId`.
//! - Callers only ever hold copies of items, never references into storage.

pub mod item;
