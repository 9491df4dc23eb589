// geowatch-api: Async Rust client for the geofencing backend (REST + live alert channel)

pub mod error;
pub mod event;
pub mod rest;
pub mod transport;
pub mod websocket;

pub use error::Error;
pub use event::{
    Coordinates, EventType, GeofenceEvent, GeofenceRef, MalformedFrame, MalformedKind, VehicleRef,
    decode_event,
};
pub use rest::RestClient;
pub use websocket::{Channel, CloseInfo, Connector, Frame, TungsteniteConnector};
