//! Notifications emitted by edit sessions and the draft synchronizer.

use tokio::sync::broadcast;
use tracing::debug;

/// Something list views or form guards may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditEvent {
    /// An entry was created, updated, or staged offline.
    EntryUpdated,
    /// The edit form was submitted on the given site.
    FormSubmitted { site_id: String },
    /// The edit form was abandoned on the given site.
    FormCancelled { site_id: String },
}

/// Broadcast channel for [`EditEvent`]s. Sending never blocks and is a
/// no-op when nobody listens.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EditEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EditEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: EditEvent) {
        if self.tx.send(event).is_err() {
            debug!("No subscribers for edit event");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
