//! Serial background writer.
//!
//! # Responsibility
//! - Apply item writes on one dedicated worker thread, in post order.
//! - Report each command's outcome on the notify context.
//!
//! # Invariants
//! - `post` never blocks on storage.
//! - Commands are applied one at a time, in the order they were posted.
//! - Dropping the queue drains already-posted commands, then joins the worker.

use crate::loader::notify::NotifyContext;
use crate::model::item::{ChecklistItem, ItemId};
use crate::service::item_store::{ItemStore, StoreError, StoreResult};
use log::{debug, info, warn};
use std::io;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Write request accepted by [`WriteQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCommand {
    Insert(String),
    Edit { id: ItemId, description: String },
    Update(ChecklistItem),
    Flip(ItemId),
    Delete(ItemId),
    DeleteChecked,
    CheckAll,
    UncheckAll,
    FlipAll,
}

impl WriteCommand {
    /// Stable operation label used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Edit { .. } => "edit",
            Self::Update(_) => "update",
            Self::Flip(_) => "flip",
            Self::Delete(_) => "delete",
            Self::DeleteChecked => "delete_checked",
            Self::CheckAll => "check_all",
            Self::UncheckAll => "uncheck_all",
            Self::FlipAll => "flip_all",
        }
    }

    /// Runs the command synchronously against `store`.
    pub fn apply(&self, store: &ItemStore) -> StoreResult<WriteOutcome> {
        let outcome = match self {
            Self::Insert(description) => WriteOutcome::Inserted(store.insert(description)?),
            Self::Edit { id, description } => WriteOutcome::Touched(store.edit(*id, description)?),
            Self::Update(item) => WriteOutcome::Touched(store.update(item)?),
            Self::Flip(id) => WriteOutcome::Touched(store.flip(*id)?),
            Self::Delete(id) => WriteOutcome::Touched(store.delete(*id)?),
            Self::DeleteChecked => WriteOutcome::Bulk(store.delete_checked()?),
            Self::CheckAll => WriteOutcome::Bulk(store.check_all()?),
            Self::UncheckAll => WriteOutcome::Bulk(store.uncheck_all()?),
            Self::FlipAll => WriteOutcome::Bulk(store.flip_all()?),
        };
        Ok(outcome)
    }
}

/// Successful result of a [`WriteCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// New item id.
    Inserted(ItemId),
    /// Whether the targeted item existed.
    Touched(bool),
    /// Rows affected by a bulk operation.
    Bulk(usize),
}

/// Handler invoked on the notify context after each command.
pub type WriteHandler = dyn Fn(WriteCommand, StoreResult<WriteOutcome>) + Send + Sync;

/// Single-threaded write worker sharing the process store.
pub struct WriteQueue {
    tx: Option<Sender<WriteCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl WriteQueue {
    /// Starts the worker thread.
    ///
    /// # Errors
    /// - Returns an error when the OS refuses to spawn the thread.
    pub fn start<N, H>(store: ItemStore, notify: N, handler: H) -> io::Result<Self>
    where
        N: NotifyContext + 'static,
        H: Fn(WriteCommand, StoreResult<WriteOutcome>) + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::channel::<WriteCommand>();
        let handler: Arc<WriteHandler> = Arc::new(handler);

        let worker = thread::Builder::new()
            .name("checklist-writer".to_string())
            .spawn(move || {
                info!("event=write_queue module=loader status=start");
                let mut applied = 0_u64;
                for command in rx {
                    let result = command.apply(&store);
                    applied += 1;
                    match &result {
                        Ok(_) => debug!(
                            "event=write_queue module=loader status=ok op={}",
                            command.name()
                        ),
                        Err(err) => warn!(
                            "event=write_queue module=loader status=error op={} error={}",
                            command.name(),
                            err
                        ),
                    }
                    let handler = Arc::clone(&handler);
                    notify.post(Box::new(move || handler(command, result)));
                }
                info!(
                    "event=write_queue module=loader status=stop applied={}",
                    applied
                );
            })?;

        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// Enqueues `command` without waiting for it to run.
    ///
    /// # Errors
    /// - Returns `PersistenceUnavailable` when the worker has stopped.
    pub fn post(&self, command: WriteCommand) -> StoreResult<()> {
        let stopped =
            || StoreError::PersistenceUnavailable("write queue worker stopped".to_string());
        let tx = self.tx.as_ref().ok_or_else(stopped)?;
        tx.send(command).map_err(|_| stopped())
    }
}

impl Drop for WriteQueue {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("event=write_queue module=loader status=error error_code=worker_panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{WriteCommand, WriteOutcome};
    use crate::model::item::ChecklistItem;
    use crate::service::item_store::{ItemStore, StoreError};

    #[test]
    fn apply_maps_each_command_to_its_outcome() {
        let store = ItemStore::open_in_memory().unwrap();

        let id = match WriteCommand::Insert("tea".to_string()).apply(&store).unwrap() {
            WriteOutcome::Inserted(id) => id,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(
            WriteCommand::Flip(id).apply(&store).unwrap(),
            WriteOutcome::Touched(true)
        );
        assert_eq!(
            WriteCommand::Update(ChecklistItem::new(id, "green tea"))
                .apply(&store)
                .unwrap(),
            WriteOutcome::Touched(true)
        );
        assert_eq!(
            WriteCommand::FlipAll.apply(&store).unwrap(),
            WriteOutcome::Bulk(1)
        );
        assert_eq!(
            WriteCommand::DeleteChecked.apply(&store).unwrap(),
            WriteOutcome::Bulk(1)
        );
        assert_eq!(
            WriteCommand::Delete(id).apply(&store).unwrap(),
            WriteOutcome::Touched(false)
        );
    }

    #[test]
    fn apply_surfaces_invalid_description() {
        let store = ItemStore::open_in_memory().unwrap();
        let err = WriteCommand::Insert(String::new())
            .apply(&store)
            .unwrap_err();
        assert_eq!(err, StoreError::InvalidDescription);
    }
}
