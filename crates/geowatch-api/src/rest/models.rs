// REST request and response types
//
// Field names follow the backend's snake_case JSON exactly. Response
// wrappers (`{ "geofences": [...], "time_ns": "..." }`) are private to the
// endpoint modules; only the payloads are public.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{Coordinates, EventType, GeofenceEvent, GeofenceRef, VehicleRef};

// ── Geofences ────────────────────────────────────────────────────────

/// Geofence categories the backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeofenceCategory {
    DeliveryZone,
    RestrictedZone,
    TollZone,
    CustomerArea,
}

impl GeofenceCategory {
    pub const ALL: [Self; 4] = [
        Self::DeliveryZone,
        Self::RestrictedZone,
        Self::TollZone,
        Self::CustomerArea,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeliveryZone => "delivery_zone",
            Self::RestrictedZone => "restricted_zone",
            Self::TollZone => "toll_zone",
            Self::CustomerArea => "customer_area",
        }
    }
}

impl fmt::Display for GeofenceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeofenceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|c| c.as_str()).collect();
                format!("unknown category '{s}', expected one of: {}", valid.join(", "))
            })
    }
}

/// A stored geofence polygon. Coordinates are `[latitude, longitude]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub coordinates: Vec<[f64; 2]>,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /geofences`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewGeofence {
    pub name: String,
    pub description: String,
    pub coordinates: Vec<[f64; 2]>,
    pub category: GeofenceCategory,
}

/// Reply to `POST /geofences`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedGeofence {
    pub id: String,
    pub name: String,
    pub status: String,
}

/// A geofence a vehicle is currently inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeofenceStatus {
    pub geofence_id: String,
    pub geofence_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

// ── Vehicles ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    pub vehicle_number: String,
    pub driver_name: String,
    pub vehicle_type: String,
    pub phone: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /vehicles`. Every field is required by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewVehicle {
    pub vehicle_number: String,
    pub driver_name: String,
    pub vehicle_type: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedVehicle {
    pub id: String,
    pub vehicle_number: String,
    pub status: String,
}

/// Body of `POST /vehicles/location`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationUpdate {
    pub vehicle_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationUpdateResult {
    pub vehicle_id: String,
    pub location_updated: bool,
    #[serde(default)]
    pub current_geofences: Vec<GeofenceStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

/// Reply to `GET /vehicles/location/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleLocation {
    pub vehicle_id: String,
    pub vehicle_number: String,
    pub current_location: PositionFix,
    #[serde(default)]
    pub current_geofences: Vec<GeofenceStatus>,
}

// ── Alert rules ──────────────────────────────────────────────────────

/// Which crossings an alert rule fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertTrigger {
    Entry,
    Exit,
    Both,
}

impl fmt::Display for AlertTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Entry => "entry",
            Self::Exit => "exit",
            Self::Both => "both",
        })
    }
}

/// Body of `POST /alerts/configure`. `vehicle_id: None` means every vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertRuleRequest {
    pub geofence_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    pub event_type: AlertTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredAlert {
    pub alert_id: String,
    pub geofence_id: String,
    #[serde(default)]
    pub vehicle_id: Option<String>,
    pub event_type: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRule {
    pub alert_id: String,
    pub geofence_id: String,
    pub geofence_name: String,
    #[serde(default)]
    pub vehicle_id: Option<String>,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    pub event_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// ── Violation history ────────────────────────────────────────────────

/// One recorded boundary crossing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub id: String,
    pub vehicle_id: String,
    pub vehicle_number: String,
    pub geofence_id: String,
    pub geofence_name: String,
    pub event_type: EventType,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

/// Filters for `GET /violations/history`. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViolationQuery {
    pub vehicle_id: Option<String>,
    pub geofence_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationPage {
    pub violations: Vec<Violation>,
    pub total_count: u64,
}

impl From<Violation> for GeofenceEvent {
    /// Re-shape a historical record as a live event so the recent-alerts
    /// view can be seeded from history.
    fn from(v: Violation) -> Self {
        Self {
            event_id: v.id,
            event_type: v.event_type,
            timestamp: v.timestamp.to_rfc3339(),
            vehicle: VehicleRef {
                vehicle_number: v.vehicle_number,
                vehicle_id: Some(v.vehicle_id),
                driver_name: None,
            },
            geofence: GeofenceRef {
                geofence_name: v.geofence_name,
                geofence_id: Some(v.geofence_id),
                category: None,
            },
            location: Some(Coordinates {
                latitude: v.latitude,
                longitude: v.longitude,
            }),
        }
    }
}
