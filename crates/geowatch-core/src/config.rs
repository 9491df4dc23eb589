// ── Runtime live-alert configuration ──
//
// Describes where the live channel lives and how the connection behaves.
// Never touches disk: the CLI builds an `AlertsConfig` from its profile
// and hands it in.

use std::time::Duration;

use url::Url;

/// Default live channel endpoint.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8080/ws/alerts";

/// Fixed delay between a close and the next connection attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(3000);

/// How many events the recent-alerts view keeps.
pub const DEFAULT_RECENT_CAPACITY: usize = 5;

/// Configuration for one live alert subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertsConfig {
    /// Push channel URL (`ws://` or `wss://`).
    pub ws_url: Url,
    /// Delay before reconnecting after any close. Never grows.
    pub retry_delay: Duration,
    /// Upper bound on the graceful close handshake during shutdown.
    pub close_timeout: Duration,
    /// Capacity of the recent-alerts view.
    pub recent_capacity: usize,
}

impl AlertsConfig {
    pub fn new(ws_url: Url) -> Self {
        Self {
            ws_url,
            retry_delay: DEFAULT_RETRY_DELAY,
            close_timeout: Duration::from_secs(1),
            recent_capacity: DEFAULT_RECENT_CAPACITY,
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        let ws_url = Url::parse(DEFAULT_WS_URL)
            .unwrap_or_else(|_| unreachable!("DEFAULT_WS_URL is a valid URL"));
        Self::new(ws_url)
    }
}
