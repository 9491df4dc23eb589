// REST API client
//
// Thin typed wrapper over the backend's CRUD endpoints. Each resource
// lives in its own file as an inherent `impl RestClient` block.

mod alerts;
mod client;
mod geofences;
pub mod models;
mod vehicles;
mod violations;

pub use client::RestClient;
pub use geofences::validate_polygon;
pub use models::*;
pub use violations::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
