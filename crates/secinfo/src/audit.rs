//! Handoff Event Log
//!
//! Records every relocation and derivation outcome for the audit trail.
//! Events never carry secret bytes, only sizes, indices, and versions.

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use secinfo_core::DerivationOutcome;

/// Monotonic event identifier
pub type EventId = u64;

/// A handoff event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandoffEvent {
    /// Unique event ID (monotonic)
    pub id: EventId,
    /// Timestamp (nanos since boot, from the HAL)
    pub timestamp: u64,
    /// What happened
    pub event_type: HandoffEventType,
}

/// Type of handoff event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandoffEventType {
    /// Blob moved from an external region into the staging slot
    Staged { size: u32 },
    /// Staged blob moved to its final owner; slot released
    Delivered { size: u32 },
    /// Blob moved directly between two external regions
    Transferred { size: u32 },
    /// Key derived from the selected seed
    KeyDerived {
        seed_index: u32,
        anti_rollback_version: u32,
    },
    /// Derivation failed and the blob was destroyed
    KeyDiscarded { outcome: DerivationOutcome },
}

/// Maximum number of events to keep in memory
const MAX_HANDOFF_EVENTS: usize = 64;

/// Handoff event log.
///
/// Append-only with monotonic IDs; the oldest events are dropped once the
/// log is full.
pub struct HandoffLog {
    /// Event entries (append-only)
    events: Vec<HandoffEvent>,
    /// Next event ID to assign
    next_id: EventId,
}

impl HandoffLog {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_id: 0,
        }
    }

    /// Append an event and return its ID.
    pub fn record(&mut self, event_type: HandoffEventType, timestamp: u64) -> EventId {
        let id = self.next_id;
        self.next_id += 1;

        self.events.push(HandoffEvent {
            id,
            timestamp,
            event_type,
        });

        self.trim_if_needed();
        id
    }

    pub fn events(&self) -> &[HandoffEvent] {
        &self.events
    }

    /// Get the most recent N events, newest first.
    pub fn get_recent(&self, count: usize) -> Vec<&HandoffEvent> {
        self.events.iter().rev().take(count).collect()
    }

    /// The most recent event, if any
    pub fn last(&self) -> Option<&HandoffEvent> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn next_id(&self) -> EventId {
        self.next_id
    }

    fn trim_if_needed(&mut self) {
        if self.events.len() > MAX_HANDOFF_EVENTS {
            let drain_count = self.events.len() - MAX_HANDOFF_EVENTS;
            self.events.drain(0..drain_count);
        }
    }
}

impl Default for HandoffLog {
    fn default() -> Self {
        Self::new()
    }
}
