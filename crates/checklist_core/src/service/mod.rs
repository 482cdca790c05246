//! Core use-case services.
//!
//! # Responsibility
//! - Wrap repository calls into atomic, process-shared operations.
//! - Keep callers decoupled from connection and transaction handling.

pub mod item_store;
