//! In-memory event log adapter.
//!
//! Implements `EventSink` by appending to a shared list and logging each
//! event. Indexers and tests read the list back.

use parking_lot::Mutex;
use tracing::info;

use crate::domain::AccountId;
use crate::events::KeystoreEvent;
use crate::ports::EventSink;

/// Append-only in-memory event log.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<KeystoreEvent>>,
}

impl InMemoryEventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every published event, in order.
    pub fn events(&self) -> Vec<KeystoreEvent> {
        self.events.lock().clone()
    }

    /// Events concerning `account`, in order.
    pub fn events_for(&self, account: &AccountId) -> Vec<KeystoreEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.account() == account)
            .cloned()
            .collect()
    }

    /// Number of published events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if nothing was published.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Most recent event.
    pub fn last(&self) -> Option<KeystoreEvent> {
        self.events.lock().last().cloned()
    }
}

impl EventSink for InMemoryEventLog {
    fn publish(&self, event: KeystoreEvent) {
        info!(topic = event.topic(), account = %event.account(), "[qc-18] event published");
        self.events.lock().push(event);
    }
}
