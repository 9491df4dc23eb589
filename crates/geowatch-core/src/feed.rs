// Consumer-local views derived from hub notifications.
//
// Each view is owned by one consumer and rebuilt from zero when that
// consumer mounts. Views feed on `HubState` and use `sequence` to tell a
// new event apart from a connectivity-only notification.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use geowatch_api::{EventType, GeofenceEvent};

use crate::config::DEFAULT_RECENT_CAPACITY;
use crate::hub::HubState;

// ── Recent events ────────────────────────────────────────────────────

/// Bounded newest-first list of recent events.
#[derive(Debug, Clone)]
pub struct RecentEvents {
    events: VecDeque<Arc<GeofenceEvent>>,
    capacity: usize,
    last_sequence: u64,
}

impl RecentEvents {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            last_sequence: 0,
        }
    }

    /// Seed with historical events (newest first), e.g. from the
    /// violation history endpoint. Live events observed later go in front.
    pub fn seed(&mut self, history: impl IntoIterator<Item = GeofenceEvent>) {
        for event in history {
            if self.events.len() == self.capacity {
                break;
            }
            self.events.push_back(Arc::new(event));
        }
    }

    /// Fold one hub notification in. Returns `true` if the list changed.
    pub fn observe(&mut self, state: &HubState) -> bool {
        if state.sequence <= self.last_sequence {
            return false;
        }
        self.last_sequence = state.sequence;
        let Some(event) = &state.last_event else {
            return false;
        };

        self.events.push_front(Arc::clone(event));
        self.events.truncate(self.capacity);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeofenceEvent> {
        self.events.iter().map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RecentEvents {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_CAPACITY)
    }
}

// ── Unread counter ───────────────────────────────────────────────────

/// Count of events seen since the last reset.
#[derive(Debug, Clone, Default)]
pub struct UnreadCounter {
    unread: u64,
    last_sequence: u64,
}

impl UnreadCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one hub notification in. Returns `true` if the count changed.
    pub fn observe(&mut self, state: &HubState) -> bool {
        if state.sequence <= self.last_sequence || state.last_event.is_none() {
            return false;
        }
        // One notification per publish, but count the gap anyway if a
        // consumer skipped some.
        let fresh = if self.last_sequence == 0 {
            1
        } else {
            state.sequence - self.last_sequence
        };
        self.last_sequence = state.sequence;
        self.unread = self.unread.saturating_add(fresh);
        true
    }

    /// Mark everything read.
    pub fn reset(&mut self) {
        self.unread = 0;
    }

    pub fn count(&self) -> u64 {
        self.unread
    }
}

// ── Toast ────────────────────────────────────────────────────────────

/// Display severity of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Vehicle entered a geofence.
    Info,
    /// Vehicle left a geofence.
    Warning,
    /// Unrecognized event type.
    Neutral,
}

/// One human-readable line announcing an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub severity: Severity,
    pub message: String,
}

impl Toast {
    pub fn for_event(event: &GeofenceEvent) -> Self {
        let (severity, verb) = match &event.event_type {
            EventType::Entry => (Severity::Info, "entered"),
            EventType::Exit => (Severity::Warning, "exited"),
            EventType::Unrecognized(_) => (Severity::Neutral, "crossed"),
        };
        Self {
            severity,
            message: format!(
                "{}: {} {verb} {}",
                event.event_type.as_str().to_uppercase(),
                event.vehicle.vehicle_number,
                event.geofence.geofence_name,
            ),
        }
    }
}

impl fmt::Display for Toast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Emits one toast per new event; connectivity-only notifications and
/// the replayed state a subscriber sees on mount produce nothing.
#[derive(Debug, Clone, Default)]
pub struct ToastFeed {
    last_sequence: Option<u64>,
}

impl ToastFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, state: &HubState) -> Option<Toast> {
        let previous = self.last_sequence.replace(state.sequence)?;
        if state.sequence <= previous {
            return None;
        }
        state.last_event.as_deref().map(Toast::for_event)
    }
}
