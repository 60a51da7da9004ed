//! Background encode-and-send worker
//!
//! Runs on its own thread, woken through the capacity-1 wake channel. Each
//! wake drains the mailbox slot, encodes the snapshot and hands the batch to
//! the transport sender. Network calls may block here; nothing flows back to
//! the audio thread.

use crossbeam::atomic::AtomicCell;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::mailbox::Mailbox;
use crate::error::Error;
use crate::network::{SendReport, TransportSender};
use crate::protocol::encode;
use crate::transport::TransportSnapshot;

/// How often the worker re-checks its running flag while idle
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Send one pending snapshot, if any
///
/// `on_sent` runs after the batch went out but before the mailbox returns to
/// idle. Returns `None` when the slot was empty.
pub fn send_pending(
    mailbox: &Mailbox,
    sender: &mut TransportSender,
    on_sent: impl FnOnce(&TransportSnapshot, &SendReport),
) -> Option<SendReport> {
    let snapshot = mailbox.claim()?;
    let messages = encode(&snapshot);
    let report = sender.send(&messages);
    on_sent(&snapshot, &report);
    mailbox.finish();
    Some(report)
}

/// What the worker thread hands back when it exits, so it can be restarted
pub struct WorkerParts {
    pub wake: Receiver<()>,
    pub sender: TransportSender,
}

/// Handle to the running worker thread
pub struct SendWorker {
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<WorkerParts>>,
    batches: Arc<AtomicU64>,
    last_sent: Arc<AtomicCell<Option<TransportSnapshot>>>,
}

impl SendWorker {
    /// Spawn the worker thread; it owns `sender` from here on
    pub fn spawn(mailbox: Arc<Mailbox>, wake: Receiver<()>, mut sender: TransportSender) -> Result<Self, Error> {
        let running = Arc::new(AtomicBool::new(true));
        let batches = Arc::new(AtomicU64::new(0));
        let last_sent = Arc::new(AtomicCell::new(None));

        let running_for_loop = running.clone();
        let batches_for_loop = batches.clone();
        let last_sent_for_loop = last_sent.clone();

        let handle = thread::Builder::new()
            .name("osc-send".to_string())
            .spawn(move || {
                tracing::debug!("Send worker started");
                while running_for_loop.load(Ordering::Relaxed) {
                    match wake.recv_timeout(POLL_INTERVAL) {
                        Ok(()) => {
                            send_pending(&mailbox, &mut sender, |snapshot, _report| {
                                last_sent_for_loop.store(Some(*snapshot));
                                batches_for_loop.fetch_add(1, Ordering::SeqCst);
                            });
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("Send worker stopped");
                WorkerParts { wake, sender }
            })?;

        Ok(Self {
            running,
            thread_handle: Some(handle),
            batches,
            last_sent,
        })
    }

    /// Stop the worker and wait for the current send to finish
    ///
    /// Returns the wake receiver and sender unless the thread was already
    /// stopped or panicked.
    pub fn stop(&mut self) -> Option<WorkerParts> {
        self.running.store(false, Ordering::SeqCst);

        let handle = self.thread_handle.take()?;
        match handle.join() {
            Ok(parts) => Some(parts),
            Err(_) => {
                tracing::error!("Send worker panicked");
                None
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle.is_some() && self.running.load(Ordering::SeqCst)
    }

    /// Batches handed to the sender so far
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::SeqCst)
    }

    /// Most recent snapshot the worker sent
    pub fn last_sent(&self) -> Option<TransportSnapshot> {
        self.last_sent.load()
    }
}

impl Drop for SendWorker {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
