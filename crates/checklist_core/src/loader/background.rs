//! One-shot background snapshot loader.
//!
//! # Responsibility
//! - Run `ItemStore::fetch_all` off the caller's thread.
//! - Hand the snapshot (or the store error) to a handler on the notify context.
//!
//! # Invariants
//! - `request_refresh` never blocks the caller.
//! - At most one worker per loader is fetching at any time. Requests that
//!   arrive while it runs are coalesced into one follow-up fetch.
//! - Only the most recently requested refresh is delivered; older results
//!   are dropped when they reach the notify context.
//! - After teardown no handler call happens, even for in-flight refreshes.

use crate::loader::notify::NotifyContext;
use crate::model::item::ChecklistItem;
use crate::service::item_store::{ItemStore, StoreError, StoreResult};
use log::{debug, error};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Result handed to the loader handler.
pub type LoadResult = StoreResult<Vec<ChecklistItem>>;

struct LoaderShared {
    latest: AtomicU64,
    torn_down: AtomicBool,
    worker_active: AtomicBool,
    fetches: AtomicU64,
    handler: Box<dyn Fn(LoadResult) + Send + Sync>,
}

impl LoaderShared {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Runs on the notify context.
    fn deliver(&self, generation: u64, result: LoadResult) {
        if self.is_torn_down() {
            debug!(
                "event=loader_refresh module=loader status=discarded generation={}",
                generation
            );
            return;
        }

        let latest = self.latest.load(Ordering::SeqCst);
        if generation != latest {
            debug!(
                "event=loader_refresh module=loader status=superseded generation={} latest={}",
                generation, latest
            );
            return;
        }

        debug!(
            "event=loader_refresh module=loader status=deliver generation={} ok={}",
            generation,
            result.is_ok()
        );
        (self.handler)(result);
    }
}

/// Latest-request-wins bridge from the store to a notify context.
///
/// Dropping the loader tears it down.
pub struct BackgroundLoader {
    store: ItemStore,
    notify: Arc<dyn NotifyContext>,
    shared: Arc<LoaderShared>,
}

impl BackgroundLoader {
    /// Creates a loader that reports every delivered refresh to `handler`.
    ///
    /// `handler` only ever runs on `notify`.
    pub fn new<N, H>(store: ItemStore, notify: N, handler: H) -> Self
    where
        N: NotifyContext + 'static,
        H: Fn(LoadResult) + Send + Sync + 'static,
    {
        Self {
            store,
            notify: Arc::new(notify),
            shared: Arc::new(LoaderShared {
                latest: AtomicU64::new(0),
                torn_down: AtomicBool::new(false),
                worker_active: AtomicBool::new(false),
                fetches: AtomicU64::new(0),
                handler: Box::new(handler),
            }),
        }
    }

    /// Requests a fresh snapshot and supersedes every earlier request.
    ///
    /// Starts a worker when none is running; otherwise the running worker
    /// picks the request up once its current fetch completes.
    ///
    /// Returns the generation number assigned to this request.
    pub fn request_refresh(&self) -> u64 {
        let generation = self.shared.latest.fetch_add(1, Ordering::SeqCst) + 1;

        if self.shared.worker_active.swap(true, Ordering::SeqCst) {
            debug!(
                "event=loader_refresh module=loader status=queued generation={}",
                generation
            );
            return generation;
        }
        debug!(
            "event=loader_refresh module=loader status=start generation={}",
            generation
        );

        let store = self.store.clone();
        let notify = Arc::clone(&self.notify);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("checklist-loader".to_string())
            .spawn(move || run_worker(store, notify, shared));

        if let Err(err) = spawned {
            error!(
                "event=loader_refresh module=loader status=error generation={} error_code=spawn_failed error={}",
                generation, err
            );
            self.shared.worker_active.store(false, Ordering::SeqCst);
            let shared = Arc::clone(&self.shared);
            let failure = StoreError::PersistenceUnavailable(format!(
                "failed to start loader thread: {err}"
            ));
            self.notify
                .post(Box::new(move || shared.deliver(generation, Err(failure))));
        }

        generation
    }

    /// Generation of the most recent request, `0` before the first one.
    pub fn latest_generation(&self) -> u64 {
        self.shared.latest.load(Ordering::SeqCst)
    }

    /// Number of `fetch_all` calls the worker has completed.
    pub fn completed_fetches(&self) -> u64 {
        self.shared.fetches.load(Ordering::SeqCst)
    }

    /// Stops all future deliveries and lets the worker exit early. Idempotent.
    ///
    /// The "no handler call after teardown" guarantee holds when this runs
    /// on the notify context (dropping the loader there included). Called
    /// from any other thread, it can race with a delivery already running.
    pub fn shutdown(&self) {
        if !self.shared.torn_down.swap(true, Ordering::SeqCst) {
            debug!("event=loader_shutdown module=loader status=ok");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.is_torn_down()
    }
}

impl Drop for BackgroundLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Fetches until the newest generation has been posted, then releases the
/// worker slot.
fn run_worker(store: ItemStore, notify: Arc<dyn NotifyContext>, shared: Arc<LoaderShared>) {
    loop {
        if shared.is_torn_down() {
            shared.worker_active.store(false, Ordering::SeqCst);
            debug!("event=loader_worker module=loader status=stopped reason=torn_down");
            return;
        }

        let generation = shared.latest.load(Ordering::SeqCst);
        let started_at = Instant::now();
        let result = store.fetch_all();
        shared.fetches.fetch_add(1, Ordering::SeqCst);
        debug!(
            "event=loader_fetch module=loader status={} generation={} duration_ms={}",
            if result.is_ok() { "ok" } else { "error" },
            generation,
            started_at.elapsed().as_millis()
        );

        if shared.latest.load(Ordering::SeqCst) != generation {
            debug!(
                "event=loader_refresh module=loader status=superseded generation={}",
                generation
            );
            continue;
        }

        let delivery = Arc::clone(&shared);
        notify.post(Box::new(move || delivery.deliver(generation, result)));

        shared.worker_active.store(false, Ordering::SeqCst);
        // A request that saw the slot taken before the store above is ours
        // to serve; one arriving after it starts its own worker.
        if shared.latest.load(Ordering::SeqCst) == generation
            || shared.worker_active.swap(true, Ordering::SeqCst)
        {
            return;
        }
    }
}
