//! Checklist item domain model.
//!
//! # Responsibility
//! - Define the record persisted in the `items` table.
//! - Validate caller-provided descriptions before they reach storage.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused for another item.
//! - `description` is never empty or whitespace-only once persisted.
//! - New items start unchecked.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned identifier of a checklist item.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type ItemId = i64;

/// Validation failure for item content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemValidationError {
    /// Description is empty or contains only whitespace.
    EmptyDescription,
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDescription => write!(f, "item description cannot be empty"),
        }
    }
}

impl Error for ItemValidationError {}

/// One checklist entry as seen by callers.
///
/// Values of this type are always snapshots; mutating one has no effect on
/// storage until it is passed back through `ItemStore::update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: ItemId,
    pub description: String,
    pub checked: bool,
}

impl ChecklistItem {
    /// Builds an unchecked item snapshot.
    pub fn new(id: ItemId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            checked: false,
        }
    }

    /// Checks content invariants enforced on every write and read.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        validate_description(&self.description)
    }
}

/// Rejects descriptions that would render as a blank row.
pub fn validate_description(description: &str) -> Result<(), ItemValidationError> {
    if description.trim().is_empty() {
        return Err(ItemValidationError::EmptyDescription);
    }
    Ok(())
}
