//! Notify contexts: where worker results get delivered.
//!
//! A UI integration implements [`NotifyContext`] on top of its own event
//! loop. [`notify_channel`] covers everything else with a plain queue that
//! the owning thread drains.

use log::debug;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Unit of work handed to a notify context.
pub type NotifyTask = Box<dyn FnOnce() + Send + 'static>;

/// Execution context that runs posted tasks on the caller's side.
pub trait NotifyContext: Send + Sync {
    /// Schedules `task`. Must not run it inline on the posting thread.
    fn post(&self, task: NotifyTask);
}

/// Creates a channel-backed notify context and its draining end.
pub fn notify_channel() -> (NotifySender, NotifyQueue) {
    let (tx, rx) = mpsc::channel();
    (NotifySender { tx }, NotifyQueue { rx })
}

/// Posting half of [`notify_channel`].
#[derive(Clone)]
pub struct NotifySender {
    tx: Sender<NotifyTask>,
}

impl NotifyContext for NotifySender {
    fn post(&self, task: NotifyTask) {
        if self.tx.send(task).is_err() {
            debug!("event=notify_post module=loader status=dropped reason=queue_closed");
        }
    }
}

/// Draining half of [`notify_channel`]; owned by the notify thread.
pub struct NotifyQueue {
    rx: Receiver<NotifyTask>,
}

impl NotifyQueue {
    /// Runs every task already queued and returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Waits up to `timeout` for one task and runs it.
    ///
    /// Returns `false` on timeout or when every sender is gone.
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{notify_channel, NotifyContext};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn posted_tasks_run_only_when_drained() {
        let (sender, queue) = notify_channel();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = Arc::clone(&counter);
            sender.post(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        assert_eq!(queue.run_pending(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn run_next_reports_disconnect() {
        let (sender, queue) = notify_channel();
        drop(sender);
        assert!(!queue.run_next(Duration::from_millis(10)));
    }

    #[test]
    fn post_after_queue_drop_is_silent() {
        let (sender, queue) = notify_channel();
        drop(queue);
        sender.post(Box::new(|| panic!("must never run")));
    }
}
