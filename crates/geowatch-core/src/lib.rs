//! Real-time alert delivery for geowatch.
//!
//! - **[`StreamConnection`]** keeps one push channel to the backend open,
//!   reconnecting after a fixed delay whenever it closes, and decodes each
//!   text frame into a [`GeofenceEvent`](geowatch_api::GeofenceEvent).
//!   Malformed frames are logged and dropped.
//!
//! - **[`EventHub`]** is the single broadcast point: it holds the last
//!   event and a connectivity flag and calls every subscriber, in order,
//!   on each change. Everything downstream of the connection reads from
//!   the hub, never from the connection.
//!
//! - **[`LiveAlerts`]** bundles the two into the value an application owns.
//!
//! - **Views** ([`RecentEvents`], [`UnreadCounter`], [`ToastFeed`]) are
//!   consumer-local projections of hub notifications.

pub mod config;
pub mod connection;
pub mod error;
pub mod feed;
mod gate;
pub mod hub;
pub mod live;
pub mod notice;

pub use config::AlertsConfig;
pub use connection::{ConnectionState, Phase, StreamConnection};
pub use error::{CoreError, HubError};
pub use feed::{RecentEvents, Severity, Toast, ToastFeed, UnreadCounter};
pub use hub::{EventHub, HubState, Subscription};
pub use live::LiveAlerts;
pub use notice::{Notice, Notifier, TracingNotifier};
