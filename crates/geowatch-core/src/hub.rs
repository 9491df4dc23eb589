//! Single broadcast point for live alerts.
//!
//! [`EventHub`] holds the most recent [`GeofenceEvent`] plus a
//! connectivity flag and calls every subscriber synchronously, in
//! registration order, whenever either changes. The stream connection is
//! its only writer; views (unread badge, recent list, toasts) are its
//! readers.
//!
//! Callbacks run with no hub lock held, so a subscriber may subscribe,
//! unsubscribe or read [`EventHub::state`] from inside its callback. It may
//! not publish: that is rejected with [`HubError::ReentrantPublish`].
//!
//! All writes, including the stream connection's, pass through a single
//! dispatch gate, so two writers can never wait on each other in opposite
//! order.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use geowatch_api::GeofenceEvent;
use indexmap::IndexMap;

use crate::error::HubError;
use crate::gate::{Gate, GateGuard, Reentered, lock};

/// Subscriber callback.
pub type Callback = Arc<dyn Fn(&HubState) + Send + Sync>;

// ── HubState ─────────────────────────────────────────────────────────

/// Snapshot handed to subscribers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HubState {
    /// Most recently published event. Retained across disconnects.
    pub last_event: Option<Arc<GeofenceEvent>>,
    /// Whether the live channel is currently open.
    pub is_connected: bool,
    /// Number of publishes so far. Connectivity-only changes leave it
    /// untouched, so views can tell "new event" from "flag flipped".
    pub sequence: u64,
}

// ── Registry ─────────────────────────────────────────────────────────

#[derive(Default)]
struct Registry {
    state: HubState,
    subscribers: IndexMap<u64, Callback>,
    next_id: u64,
}

impl Registry {
    fn snapshot(&self) -> (HubState, Vec<(u64, Callback)>) {
        let callbacks = self
            .subscribers
            .iter()
            .map(|(id, cb)| (*id, Arc::clone(cb)))
            .collect();
        (self.state.clone(), callbacks)
    }
}

// ── EventHub ─────────────────────────────────────────────────────────

/// Live alert broadcaster. Share it as `Arc<EventHub>`.
#[derive(Default)]
pub struct EventHub {
    registry: Arc<Mutex<Registry>>,
    dispatch: Gate,
    /// Connectivity change waiting for the current dispatch to finish.
    deferred: Mutex<Option<bool>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`. It is invoked immediately with the current
    /// state and again after every change until the returned handle is
    /// dropped or unsubscribed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&HubState) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);

        // Outside a fan-out, take the dispatch gate so the initial call
        // can't interleave with a publish on another thread. Inside one
        // the gate is already ours.
        let _dispatch = self.dispatch().ok();

        let (id, state) = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.subscribers.insert(id, Arc::clone(&callback));
            (id, registry.state.clone())
        };
        tracing::trace!(subscriber = id, "subscribed");

        callback(&state);

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Remove a subscription. Idempotent; handles from another hub are
    /// ignored.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        if Weak::ptr_eq(&subscription.registry, &Arc::downgrade(&self.registry)) {
            subscription.unsubscribe();
        }
    }

    /// Record `event` as the latest and notify every subscriber.
    pub fn publish(&self, event: GeofenceEvent) -> Result<(), HubError> {
        let Ok(dispatch) = self.dispatch() else {
            tracing::error!(
                event_id = %event.event_id,
                "publish from inside a subscriber callback rejected"
            );
            return Err(HubError::ReentrantPublish);
        };
        dispatch.publish(event);
        Ok(())
    }

    /// Update the connectivity flag. Subscribers are notified only when
    /// the value changes.
    pub fn set_connected(&self, connected: bool) -> Result<(), HubError> {
        let Ok(dispatch) = self.dispatch() else {
            tracing::error!(connected, "connectivity change from inside a subscriber rejected");
            return Err(HubError::ReentrantPublish);
        };
        dispatch.set_connected(connected);
        Ok(())
    }

    /// Current state snapshot.
    pub fn state(&self) -> HubState {
        lock(&self.registry).state.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }

    /// Enter the dispatch gate, blocking while another thread holds it.
    /// Fails if the calling thread is already inside a dispatch.
    pub(crate) fn dispatch(&self) -> Result<Dispatch<'_>, Reentered> {
        let gate = self.dispatch.enter()?;
        let dispatch = Dispatch {
            hub: self,
            _gate: gate,
        };
        dispatch.apply_deferred();
        Ok(dispatch)
    }

    /// Queue a connectivity change for the next dispatch boundary. The
    /// holder of the gate applies it before releasing; if nobody holds it
    /// the next [`dispatch`](Self::dispatch) does.
    pub(crate) fn defer_connected(&self, connected: bool) {
        *lock(&self.deferred) = Some(connected);
    }

    fn fan_out(&self, state: &HubState, callbacks: Vec<(u64, Callback)>) {
        for (id, callback) in callbacks {
            // A subscriber removed by an earlier callback in this round
            // must not be called.
            if !lock(&self.registry).subscribers.contains_key(&id) {
                continue;
            }
            callback(state);
        }
    }
}

// ── Dispatch ─────────────────────────────────────────────────────────

/// Exclusive right to change hub state and run the fan-out. Every writer,
/// the stream connection's worker included, goes through this one gate.
pub(crate) struct Dispatch<'a> {
    hub: &'a EventHub,
    _gate: GateGuard<'a>,
}

impl Dispatch<'_> {
    pub(crate) fn publish(&self, event: GeofenceEvent) {
        let (state, callbacks) = {
            let mut registry = lock(&self.hub.registry);
            registry.state.last_event = Some(Arc::new(event));
            registry.state.sequence += 1;
            registry.snapshot()
        };
        tracing::debug!(
            sequence = state.sequence,
            subscribers = callbacks.len(),
            "publishing event"
        );
        self.hub.fan_out(&state, callbacks);
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        let (state, callbacks) = {
            let mut registry = lock(&self.hub.registry);
            if registry.state.is_connected == connected {
                return;
            }
            registry.state.is_connected = connected;
            registry.snapshot()
        };
        tracing::debug!(connected, "connectivity changed");
        self.hub.fan_out(&state, callbacks);
    }

    fn apply_deferred(&self) {
        loop {
            let next = lock(&self.hub.deferred).take();
            let Some(connected) = next else {
                return;
            };
            self.set_connected(connected);
        }
    }
}

impl Drop for Dispatch<'_> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            self.apply_deferred();
        }
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = lock(&self.registry);
        f.debug_struct("EventHub")
            .field("state", &registry.state)
            .field("subscribers", &registry.subscribers.len())
            .finish()
    }
}

// ── Subscription ─────────────────────────────────────────────────────

/// Handle returned by [`EventHub::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Stop receiving notifications. Safe to call any number of times,
    /// including after the hub itself is gone.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            if lock(&registry).subscribers.shift_remove(&self.id).is_some() {
                tracing::trace!(subscriber = self.id, "unsubscribed");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────────
