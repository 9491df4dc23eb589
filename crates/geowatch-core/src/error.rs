// ── Core error types ──
//
// Errors surfaced by geowatch-core. The live connection never returns
// errors to its owner (it logs and retries); these cover the hub's
// misuse guard and the REST-backed helpers.

use thiserror::Error;

/// Rejected hub operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HubError {
    /// A subscriber callback tried to publish while the hub was already
    /// notifying subscribers on the same thread.
    #[error("publish issued from inside a subscriber callback")]
    ReentrantPublish,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Cannot reach geofencing backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Rejected by backend: {message}")]
    Rejected { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Hub(#[from] HubError),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<geowatch_api::Error> for CoreError {
    fn from(err: geowatch_api::Error) -> Self {
        use geowatch_api::Error as Api;

        match err {
            Api::Transport(ref e) if e.is_connect() || e.is_timeout() => {
                CoreError::ConnectionFailed {
                    url: e.url().map(ToString::to_string).unwrap_or_default(),
                    reason: e.to_string(),
                }
            }
            Api::Transport(e) => CoreError::Api {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            Api::Api { status: 404, message } => CoreError::NotFound { message },
            Api::Api {
                status: 400..=499,
                message,
            } => CoreError::Rejected { message },
            Api::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            Api::Validation { field, reason } => CoreError::ValidationFailed {
                message: format!("{field}: {reason}"),
            },
            Api::WebSocketConnect(reason) | Api::WebSocketStream(reason) => {
                CoreError::ConnectionFailed {
                    url: String::new(),
                    reason,
                }
            }
            Api::Deserialization { message, body: _ } => CoreError::Api {
                message: format!("unexpected response: {message}"),
                status: None,
            },
        }
    }
}
