// Geofence endpoints
//
// Polygons are validated locally with the same rules the backend applies,
// so obviously bad input fails before any request is sent.

use serde::Deserialize;
use tracing::debug;

use crate::error::Error;
use crate::rest::client::RestClient;
use crate::rest::models::{CreatedGeofence, Geofence, GeofenceCategory, NewGeofence};

#[derive(Deserialize)]
struct GeofenceList {
    geofences: Vec<Geofence>,
}

/// Check that `coordinates` describe a closed polygon of valid
/// `[latitude, longitude]` points.
pub fn validate_polygon(coordinates: &[[f64; 2]]) -> Result<(), Error> {
    if coordinates.len() < 4 {
        return Err(Error::validation(
            "coordinates",
            "minimum 4 coordinate points required",
        ));
    }
    if coordinates.first() != coordinates.last() {
        return Err(Error::validation(
            "coordinates",
            "first and last coordinates must be identical (closed polygon)",
        ));
    }
    for (i, [lat, lon]) in coordinates.iter().enumerate() {
        if !(-90.0..=90.0).contains(lat) {
            return Err(Error::validation(
                "coordinates",
                format!("point {i}: latitude {lat} must be between -90 and 90"),
            ));
        }
        if !(-180.0..=180.0).contains(lon) {
            return Err(Error::validation(
                "coordinates",
                format!("point {i}: longitude {lon} must be between -180 and 180"),
            ));
        }
    }
    Ok(())
}

impl RestClient {
    /// Create a geofence.
    ///
    /// `POST /geofences`
    pub async fn create_geofence(&self, geofence: &NewGeofence) -> Result<CreatedGeofence, Error> {
        if geofence.name.trim().is_empty() {
            return Err(Error::validation("name", "must not be empty"));
        }
        validate_polygon(&geofence.coordinates)?;

        let url = self.endpoint(&["geofences"])?;
        debug!(name = %geofence.name, category = %geofence.category, "creating geofence");
        self.post(url, geofence).await
    }

    /// List geofences, optionally restricted to one category.
    ///
    /// `GET /geofences[?category=...]`
    pub async fn list_geofences(
        &self,
        category: Option<GeofenceCategory>,
    ) -> Result<Vec<Geofence>, Error> {
        let mut url = self.endpoint(&["geofences"])?;
        if let Some(category) = category {
            url.query_pairs_mut().append_pair("category", category.as_str());
        }
        debug!(?category, "listing geofences");
        let list: GeofenceList = self.get(url).await?;
        Ok(list.geofences)
    }
}
