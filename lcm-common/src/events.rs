//! Enrichment progress events and the in-process event bus
//!
//! Events are broadcast via [`EventBus`] and serialized for SSE transmission.

use crate::status::EnrichmentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// LCM event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LcmEvent {
    /// Background run started for an assembly
    EnrichmentRunStarted {
        assembly_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// One bounded batch finished and its counts were persisted
    EnrichmentBatchCompleted {
        assembly_id: Uuid,
        enriched_in_batch: usize,
        errors_in_batch: usize,
        enriched_total: usize,
        enrichable_total: usize,
        timestamp: DateTime<Utc>,
    },

    /// Unprocessed set came back empty; terminal status persisted
    EnrichmentRunCompleted {
        assembly_id: Uuid,
        status: EnrichmentStatus,
        enriched_total: usize,
        enrichable_total: usize,
        timestamp: DateTime<Utc>,
    },

    /// Run stopped between batches on request
    EnrichmentRunCancelled {
        assembly_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Run aborted by a fatal condition (authentication, configuration, store)
    EnrichmentRunFailed {
        assembly_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// A failed item was resolved manually
    ItemResolved {
        assembly_id: Uuid,
        item_id: Uuid,
        external_part_id: String,
        enriched_total: usize,
        enrichable_total: usize,
        timestamp: DateTime<Utc>,
    },
}

impl LcmEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            LcmEvent::EnrichmentRunStarted { .. } => "EnrichmentRunStarted",
            LcmEvent::EnrichmentBatchCompleted { .. } => "EnrichmentBatchCompleted",
            LcmEvent::EnrichmentRunCompleted { .. } => "EnrichmentRunCompleted",
            LcmEvent::EnrichmentRunCancelled { .. } => "EnrichmentRunCancelled",
            LcmEvent::EnrichmentRunFailed { .. } => "EnrichmentRunFailed",
            LcmEvent::ItemResolved { .. } => "ItemResolved",
        }
    }

    pub fn assembly_id(&self) -> Uuid {
        match self {
            LcmEvent::EnrichmentRunStarted { assembly_id, .. }
            | LcmEvent::EnrichmentBatchCompleted { assembly_id, .. }
            | LcmEvent::EnrichmentRunCompleted { assembly_id, .. }
            | LcmEvent::EnrichmentRunCancelled { assembly_id, .. }
            | LcmEvent::EnrichmentRunFailed { assembly_id, .. }
            | LcmEvent::ItemResolved { assembly_id, .. } => *assembly_id,
        }
    }
}

/// Broadcast bus for [`LcmEvent`]
///
/// Cloning is cheap; all clones share one channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LcmEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per slow subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<LcmEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring the case where nobody is listening
    ///
    /// Progress events are advisory: the persisted counters are authoritative.
    pub fn emit_lossy(&self, event: LcmEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No SSE subscribers for event");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
