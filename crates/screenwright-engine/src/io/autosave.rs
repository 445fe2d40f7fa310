//! Debounced write-behind persistence.
//!
//! One worker thread owns the [`Store`]; the session side schedules the
//! current document after every committed edit. Writes happen after a quiet
//! period, so a typing burst becomes one write, and pending state always
//! flushes on shutdown.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::warn;

use crate::editing::Document;
use crate::io::{PersistenceError, Store};

/// Quiet period before a scheduled document is written.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

enum Msg {
    Schedule(Document),
    Flush(SyncSender<()>),
}

/// Handle to the autosave worker. Dropping it flushes any pending write and
/// joins the thread.
#[derive(Debug)]
pub struct Autosave {
    tx: Option<Sender<Msg>>,
    worker: Option<JoinHandle<()>>,
    last_error: Arc<Mutex<Option<PersistenceError>>>,
}

impl Autosave {
    pub fn spawn(store: Store, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let last_error = Arc::new(Mutex::new(None));
        let worker_error = Arc::clone(&last_error);
        let worker = thread::spawn(move || worker_loop(store, debounce, rx, worker_error));
        Self {
            tx: Some(tx),
            worker: Some(worker),
            last_error,
        }
    }

    /// Queue `document` for writing after the quiet period. A newer schedule
    /// supersedes a pending one; each carries the full document, so the last
    /// writer winning loses nothing.
    pub fn schedule(&self, document: &Document) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Msg::Schedule(document.clone()));
        }
    }

    /// Write any pending document now and wait for it to hit disk.
    pub fn flush(&self) {
        let Some(tx) = &self.tx else { return };
        let (ack_tx, ack_rx) = mpsc::sync_channel(0);
        if tx.send(Msg::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    /// The most recent write failure, if any, clearing it. Failures never
    /// interrupt editing; the frontend surfaces them from here.
    pub fn take_error(&self) -> Option<PersistenceError> {
        self.last_error.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        // Disconnecting the channel tells the worker to flush and exit
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(
    store: Store,
    debounce: Duration,
    rx: Receiver<Msg>,
    last_error: Arc<Mutex<Option<PersistenceError>>>,
) {
    let mut pending: Option<Document> = None;
    loop {
        let msg = if pending.is_some() {
            match rx.recv_timeout(debounce) {
                Ok(msg) => Some(msg),
                Err(RecvTimeoutError::Timeout) => {
                    write_pending(&store, &mut pending, &last_error);
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => None,
            }
        } else {
            rx.recv().ok()
        };

        match msg {
            // Quiet period restarts on every schedule
            Some(Msg::Schedule(document)) => pending = Some(document),
            Some(Msg::Flush(ack)) => {
                write_pending(&store, &mut pending, &last_error);
                let _ = ack.send(());
            }
            None => {
                write_pending(&store, &mut pending, &last_error);
                break;
            }
        }
    }
}

fn write_pending(
    store: &Store,
    pending: &mut Option<Document>,
    last_error: &Mutex<Option<PersistenceError>>,
) {
    if let Some(document) = pending.take()
        && let Err(err) = store.save(&document)
    {
        warn!(path = %store.path().display(), error = %err, "autosave write failed");
        if let Ok(mut slot) = last_error.lock() {
            *slot = Some(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{BlockKind, Document};
    use tempfile::TempDir;

    fn doc(text: &str) -> Document {
        Document::from_parts(&[(BlockKind::Action, text)])
    }

    #[test]
    fn flush_writes_pending_state() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("screenplay.json"));
        let autosave = Autosave::spawn(store.clone(), Duration::from_secs(60));

        autosave.schedule(&doc("draft"));
        assert!(!store.path().exists()); // still inside the quiet period
        autosave.flush();
        assert_eq!(store.load().unwrap().document, doc("draft"));
    }

    #[test]
    fn quiet_period_expiry_writes_without_flush() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("screenplay.json"));
        let autosave = Autosave::spawn(store.clone(), Duration::from_millis(20));

        autosave.schedule(&doc("draft"));
        thread::sleep(Duration::from_millis(200));
        assert_eq!(store.load().unwrap().document, doc("draft"));
        drop(autosave);
    }

    #[test]
    fn rapid_schedules_keep_only_the_latest() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("screenplay.json"));
        let autosave = Autosave::spawn(store.clone(), Duration::from_secs(60));

        for i in 0..10 {
            autosave.schedule(&doc(&format!("draft {i}")));
        }
        autosave.flush();
        assert_eq!(store.load().unwrap().document, doc("draft 9"));
    }

    #[test]
    fn drop_flushes_pending_write() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("screenplay.json"));
        let autosave = Autosave::spawn(store.clone(), Duration::from_secs(60));

        autosave.schedule(&doc("final state"));
        drop(autosave);
        assert_eq!(store.load().unwrap().document, doc("final state"));
    }

    #[test]
    fn write_failure_is_recorded_not_raised() {
        let dir = TempDir::new().unwrap();
        // A directory at the target path makes the rename fail
        let target = dir.path().join("screenplay.json");
        std::fs::create_dir(&target).unwrap();
        let autosave = Autosave::spawn(Store::new(target), Duration::from_secs(60));

        autosave.schedule(&doc("doomed"));
        autosave.flush();
        assert!(autosave.take_error().is_some());
        assert!(autosave.take_error().is_none()); // cleared once taken
    }
}
