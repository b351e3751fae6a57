//! Fan-out of snapshots to subscribed observers
//!
//! Each observer owns a bounded channel. Publishing never waits: an observer
//! whose channel is closed or full misses the snapshot and is dropped, and
//! everyone else still gets it.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::snapshot::Snapshot;
use super::types::DEFAULT_OBSERVER_BUFFER;

/// Handle identifying one observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

/// The receiving end handed to a new observer
///
/// Dropping it closes the channel; the observer is removed on the next
/// publish.
#[derive(Debug)]
pub struct Subscription {
    pub id: ObserverId,
    pub receiver: mpsc::Receiver<Arc<str>>,
}

/// Outcome of one publish call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishReport {
    pub delivered: usize,
    pub dropped: usize,
}

#[derive(Default)]
struct Observers {
    next_id: u64,
    senders: HashMap<ObserverId, mpsc::Sender<Arc<str>>>,
}

/// Registry of observers, shared between the tick worker and whatever
/// accepts connections
pub struct Broadcaster {
    observers: Mutex<Observers>,
    buffer: usize,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_OBSERVER_BUFFER)
    }
}

impl Broadcaster {
    /// `buffer` is the number of snapshots an observer may lag behind
    pub fn new(buffer: usize) -> Self {
        Self {
            observers: Mutex::new(Observers::default()),
            buffer: buffer.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Observers> {
        self.observers.lock().unwrap_or_else(|poisoned| {
            warn!("Observer registry lock was poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    /// Register a new observer
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let mut observers = self.lock();
        let id = ObserverId(observers.next_id);
        observers.next_id += 1;
        observers.senders.insert(id, sender);
        info!("Observer {} connected ({} total)", id.0, observers.senders.len());
        Subscription { id, receiver }
    }

    /// Remove an observer; returns whether it was still registered
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.lock();
        let removed = observers.senders.remove(&id).is_some();
        if removed {
            info!("Observer {} disconnected ({} total)", id.0, observers.senders.len());
        }
        removed
    }

    pub fn observer_count(&self) -> usize {
        self.lock().senders.len()
    }

    /// Send a snapshot to every current observer
    pub fn publish(&self, snapshot: &Snapshot) -> PublishReport {
        let payload: Arc<str> = match snapshot.to_json() {
            Ok(json) => json.into(),
            Err(e) => {
                warn!("Skipping broadcast: {:#}", e);
                return PublishReport::default();
            }
        };
        self.publish_raw(payload)
    }

    /// Send an already serialized payload to every current observer
    pub fn publish_raw(&self, payload: Arc<str>) -> PublishReport {
        // Iterate over a copy so subscribe/unsubscribe never wait on sends
        let targets: Vec<(ObserverId, mpsc::Sender<Arc<str>>)> = self
            .lock()
            .senders
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();

        let mut report = PublishReport::default();
        let mut failed = Vec::new();

        for (id, sender) in targets {
            match sender.try_send(Arc::clone(&payload)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("Observer {} is not keeping up, dropping it", id.0);
                    failed.push(id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Observer {} channel closed", id.0);
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            let mut observers = self.lock();
            for id in &failed {
                if observers.senders.remove(id).is_some() {
                    report.dropped += 1;
                }
            }
            info!(
                "Dropped {} observer(s), {} remaining",
                report.dropped,
                observers.senders.len()
            );
        }

        report
    }
}
