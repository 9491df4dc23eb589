//! Live alert wire format.
//!
//! The backend pushes one JSON object per WebSocket text frame whenever a
//! vehicle crosses a geofence boundary:
//!
//! ```json
//! { "event_id": "evt_1", "event_type": "entry",
//!   "timestamp": "2026-10-19T08:15:00Z",
//!   "vehicle": { "vehicle_number": "KA-01-1234" },
//!   "geofence": { "geofence_name": "Warehouse" } }
//! ```
//!
//! Decoding is permissive about `event_type` (unknown values are kept,
//! not rejected) and strict about shape: a frame missing `vehicle` or
//! `geofence` is malformed and never reaches subscribers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use thiserror::Error;

// ── EventType ────────────────────────────────────────────────────────

/// Direction of a boundary crossing.
///
/// Anything other than `"entry"` / `"exit"` decodes to
/// [`Unrecognized`](Self::Unrecognized) and is presented neutrally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Entry,
    Exit,
    Unrecognized(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Entry => "entry",
            Self::Exit => "exit",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<String> for EventType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "entry" => Self::Entry,
            "exit" => Self::Exit,
            _ => Self::Unrecognized(raw),
        }
    }
}

impl From<EventType> for String {
    fn from(kind: EventType) -> Self {
        match kind {
            EventType::Unrecognized(raw) => raw,
            other => other.as_str().to_owned(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── GeofenceEvent ────────────────────────────────────────────────────

/// Vehicle that crossed the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRef {
    pub vehicle_number: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
}

/// Geofence whose boundary was crossed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeofenceRef {
    pub geofence_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geofence_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// WGS84 position, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A single entry/exit event pushed by the backend. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceEvent {
    /// Opaque backend-assigned identifier.
    pub event_id: String,

    pub event_type: EventType,

    /// Detection time as sent (ISO-8601). See [`detected_at`](Self::detected_at).
    pub timestamp: String,

    pub vehicle: VehicleRef,

    pub geofence: GeofenceRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,
}

impl GeofenceEvent {
    /// Parsed detection time, or `None` if the backend sent something
    /// that isn't RFC 3339.
    pub fn detected_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

// ── Frame classification ─────────────────────────────────────────────

/// Why a frame was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MalformedKind {
    /// Not JSON at all.
    Syntax,
    /// Valid JSON, wrong shape (missing field, wrong type).
    Shape,
    /// JSON cut off mid-value.
    Truncated,
    /// Binary frame on a text-only channel.
    NonText,
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Syntax => "syntax",
            Self::Shape => "shape",
            Self::Truncated => "truncated",
            Self::NonText => "non-text",
        })
    }
}

/// A frame that could not be decoded into a [`GeofenceEvent`].
#[derive(Debug, Clone, Error)]
#[error("malformed frame ({kind}): {detail}")]
pub struct MalformedFrame {
    pub kind: MalformedKind,
    pub detail: String,
}

impl MalformedFrame {
    pub fn non_text(len: usize) -> Self {
        Self {
            kind: MalformedKind::NonText,
            detail: format!("{len}-byte binary frame"),
        }
    }
}

/// Decode one text frame.
pub fn decode_event(text: &str) -> Result<GeofenceEvent, MalformedFrame> {
    serde_json::from_str(text).map_err(|e| {
        let kind = match e.classify() {
            Category::Data => MalformedKind::Shape,
            Category::Eof => MalformedKind::Truncated,
            Category::Syntax | Category::Io => MalformedKind::Syntax,
        };
        MalformedFrame {
            kind,
            detail: e.to_string(),
        }
    })
}

// ── Tests ────────────────────────────────────────────────────────────

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ENTRY: &str = r#"{
        "event_id": "evt_7f3a",
        "event_type": "entry",
        "timestamp": "2026-10-19T08:15:00Z",
        "vehicle": { "vehicle_id": "veh_01", "vehicle_number": "KA-01-1234", "driver_name": "R. Iyer" },
        "geofence": { "geofence_id": "geo_9c", "geofence_name": "Warehouse", "category": "delivery_zone" },
        "location": { "latitude": 12.97, "longitude": 77.59 }
    }"#;

    #[test]
    fn decodes_full_backend_message() {
        let event = decode_event(ENTRY).unwrap();
        assert_eq!(event.event_id, "evt_7f3a");
        assert_eq!(event.event_type, EventType::Entry);
        assert_eq!(event.vehicle.vehicle_number, "KA-01-1234");
        assert_eq!(event.vehicle.driver_name.as_deref(), Some("R. Iyer"));
        assert_eq!(event.geofence.geofence_name, "Warehouse");
        assert_eq!(event.geofence.category.as_deref(), Some("delivery_zone"));
        assert_eq!(
            event.location,
            Some(Coordinates {
                latitude: 12.97,
                longitude: 77.59
            })
        );
    }

    #[test]
    fn decodes_minimal_message() {
        let event = decode_event(
            r#"{"event_id":"e1","event_type":"exit","timestamp":"2026-10-19T08:15:00Z",
                "vehicle":{"vehicle_number":"MH-12-0001"},"geofence":{"geofence_name":"Depot"}}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, EventType::Exit);
        assert!(event.vehicle.vehicle_id.is_none());
        assert!(event.location.is_none());
    }

    #[test]
    fn unknown_event_type_is_kept() {
        let event = decode_event(
            r#"{"event_id":"e2","event_type":"dwell","timestamp":"t",
                "vehicle":{"vehicle_number":"V"},"geofence":{"geofence_name":"G"}}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, EventType::Unrecognized("dwell".into()));
        assert!(!event.event_type.is_recognized());
        assert_eq!(event.event_type.to_string(), "dwell");
    }

    #[test]
    fn event_type_serializes_back_to_wire_string() {
        let json = serde_json::to_string(&EventType::Exit).unwrap();
        assert_eq!(json, r#""exit""#);
        let json = serde_json::to_string(&EventType::Unrecognized("dwell".into())).unwrap();
        assert_eq!(json, r#""dwell""#);
    }

    #[test]
    fn detected_at_parses_rfc3339() {
        let event = decode_event(ENTRY).unwrap();
        let at = event.detected_at().unwrap();
        assert_eq!(at.to_rfc3339(), "2026-10-19T08:15:00+00:00");
    }

    #[test]
    fn detected_at_tolerates_garbage() {
        let mut event = decode_event(ENTRY).unwrap();
        event.timestamp = "yesterday".into();
        assert!(event.detected_at().is_none());
    }

    #[test]
    fn classifies_non_json() {
        let err = decode_event("not json at all").unwrap_err();
        assert_eq!(err.kind, MalformedKind::Syntax);
    }

    #[test]
    fn classifies_missing_field() {
        let err = decode_event(r#"{"event_id":"e1","event_type":"entry"}"#).unwrap_err();
        assert_eq!(err.kind, MalformedKind::Shape);
    }

    #[test]
    fn classifies_truncated_json() {
        let err = decode_event(r#"{"event_id":"e1","event_ty"#).unwrap_err();
        assert_eq!(err.kind, MalformedKind::Truncated);
    }

    #[test]
    fn binary_frames_are_non_text() {
        let err = MalformedFrame::non_text(12);
        assert_eq!(err.kind, MalformedKind::NonText);
        assert_eq!(err.to_string(), "malformed frame (non-text): 12-byte binary frame");
    }
}
