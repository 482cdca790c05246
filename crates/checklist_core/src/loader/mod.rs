//! Off-thread bridges between the item store and a caller's event loop.
//!
//! # Responsibility
//! - Run store reads and writes on worker threads.
//! - Deliver results only on the caller-designated notify context.
//!
//! # Invariants
//! - Nothing in this module delivers from a worker thread.
//! - The store never depends on this module.

pub mod background;
pub mod notify;
pub mod write_queue;
