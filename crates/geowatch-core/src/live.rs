// ── LiveAlerts subsystem ──
//
// Owns one hub and the connection feeding it. This is the value an
// application holds for the lifetime of its live view; dropping it tears
// the connection down.

use std::sync::Arc;

use geowatch_api::{Connector, TungsteniteConnector};

use crate::config::AlertsConfig;
use crate::connection::{Phase, StreamConnection};
use crate::hub::{EventHub, HubState, Subscription};
use crate::notice::Notifier;

/// A running (or startable) live alert feed.
#[derive(Debug)]
pub struct LiveAlerts {
    hub: Arc<EventHub>,
    connection: StreamConnection,
    config: AlertsConfig,
}

impl LiveAlerts {
    /// Build a subsystem that talks to a real WebSocket endpoint.
    pub fn new(config: AlertsConfig) -> Self {
        Self::with_connector(config, Arc::new(TungsteniteConnector))
    }

    /// Build a subsystem over any [`Connector`].
    pub fn with_connector(config: AlertsConfig, connector: Arc<dyn Connector>) -> Self {
        let hub = Arc::new(EventHub::new());
        let connection = StreamConnection::new(config.ws_url.clone(), connector, Arc::clone(&hub))
            .with_retry_delay(config.retry_delay)
            .with_close_timeout(config.close_timeout);
        Self {
            hub,
            connection,
            config,
        }
    }

    /// Route connection notices to `notifier` instead of the log.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.connection = self.connection.with_notifier(notifier);
        self
    }

    /// Connect. Idempotent while running.
    pub fn start(&self) {
        self.connection.start();
    }

    /// Tear down without waiting. Idempotent.
    pub fn stop(&self) {
        self.connection.stop();
    }

    /// Tear down and wait for the channel to close.
    pub async fn shutdown(&self) {
        self.connection.shutdown().await;
    }

    /// Subscribe to hub changes. See [`EventHub::subscribe`].
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&HubState) + Send + Sync + 'static,
    {
        self.hub.subscribe(callback)
    }

    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    pub fn state(&self) -> HubState {
        self.hub.state()
    }

    pub fn phase(&self) -> Phase {
        self.connection.phase()
    }

    pub fn connection(&self) -> &StreamConnection {
        &self.connection
    }

    pub fn config(&self) -> &AlertsConfig {
        &self.config
    }
}
