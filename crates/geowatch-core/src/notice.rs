// User-facing connection notices.
//
// The connection emits a `Notice` each time the live channel opens. How
// it is shown (log line, toast, terminal banner) is the notifier's
// business.

use std::fmt;

use url::Url;

/// Something the user should be told about the live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The live channel opened (first connect or a reconnect).
    Connected { url: Url },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { .. } => f.write_str("Real-time alerts connected!"),
        }
    }
}

/// Receives [`Notice`]s. Called synchronously from the connection worker,
/// so implementations should not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Default notifier: writes notices to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &Notice) {
        match notice {
            Notice::Connected { url } => tracing::info!(url = %url, "{notice}"),
        }
    }
}

impl<F> Notifier for F
where
    F: Fn(&Notice) + Send + Sync,
{
    fn notify(&self, notice: &Notice) {
        self(notice);
    }
}
