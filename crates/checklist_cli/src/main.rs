//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `checklist_core` wiring end to end: open the store, optionally
//!   queue one insert, then print a snapshot delivered by the loader.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `checklist [description...]`
//!
//! Environment:
//! - `CHECKLIST_DB_PATH`: database file (defaults to the temp dir).
//! - `CHECKLIST_LOG_DIR`: absolute log directory; logging stays off when unset.

use checklist_core::{
    default_log_level, init_logging, notify_channel, BackgroundLoader, ItemStore, LoadResult,
    WriteCommand, WriteQueue,
};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DB_FILE_NAME: &str = "checklist.sqlite3";
const DELIVERY_WAIT: Duration = Duration::from_secs(10);

fn main() -> ExitCode {
    if let Some(log_dir) = env_value("CHECKLIST_LOG_DIR") {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("checklist_core ping={}", checklist_core::ping());
    println!("checklist_core version={}", checklist_core::core_version());

    let db_path = resolve_db_path();
    let store = match ItemStore::open(&db_path) {
        Ok(store) => store,
        Err(err) => {
            // Without storage there is nothing this process can do.
            error!("event=cli_start module=cli status=error error={err}");
            eprintln!("failed to open {}: {err}", db_path.display());
            return ExitCode::FAILURE;
        }
    };

    let (sender, queue) = notify_channel();

    let description = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !description.trim().is_empty() {
        let writes = match WriteQueue::start(store.clone(), sender.clone(), |command, result| {
            match result {
                Ok(outcome) => println!("{} -> {outcome:?}", command.name()),
                Err(err) => eprintln!("{} failed: {err}", command.name()),
            }
        }) {
            Ok(writes) => writes,
            Err(err) => {
                eprintln!("failed to start writer: {err}");
                return ExitCode::FAILURE;
            }
        };
        if let Err(err) = writes.post(WriteCommand::Insert(description)) {
            eprintln!("failed to queue insert: {err}");
            return ExitCode::FAILURE;
        }
        // Dropping the queue waits for the insert to land.
        drop(writes);
        queue.run_pending();
    }

    let snapshot: Arc<Mutex<Option<LoadResult>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&snapshot);
    let loader = BackgroundLoader::new(store, sender, move |result| {
        if let Ok(mut slot) = sink.lock() {
            *slot = Some(result);
        }
    });
    loader.request_refresh();

    if !queue.run_next(DELIVERY_WAIT) {
        eprintln!("timed out waiting for item snapshot");
        return ExitCode::FAILURE;
    }

    let delivered = snapshot.lock().ok().and_then(|mut slot| slot.take());
    match delivered {
        Some(Ok(items)) => {
            println!("items={}", items.len());
            for item in items {
                let mark = if item.checked { "x" } else { " " };
                println!("[{mark}] {:>4} {}", item.id, item.description);
            }
            ExitCode::SUCCESS
        }
        Some(Err(err)) => {
            eprintln!("failed to load items: {err}");
            ExitCode::FAILURE
        }
        None => {
            eprintln!("no snapshot delivered");
            ExitCode::FAILURE
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    let raw = std::env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn resolve_db_path() -> PathBuf {
    env_value("CHECKLIST_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join(DB_FILE_NAME))
}
