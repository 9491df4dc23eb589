// Vehicle and location endpoints

use serde::Deserialize;
use tracing::debug;

use crate::error::Error;
use crate::rest::client::RestClient;
use crate::rest::models::{
    CreatedVehicle, LocationUpdate, LocationUpdateResult, NewVehicle, Vehicle, VehicleLocation,
};

#[derive(Deserialize)]
struct VehicleList {
    vehicles: Vec<Vehicle>,
}

impl RestClient {
    /// Register a vehicle.
    ///
    /// `POST /vehicles`
    pub async fn create_vehicle(&self, vehicle: &NewVehicle) -> Result<CreatedVehicle, Error> {
        let fields = [
            ("vehicle_number", &vehicle.vehicle_number),
            ("driver_name", &vehicle.driver_name),
            ("vehicle_type", &vehicle.vehicle_type),
            ("phone", &vehicle.phone),
        ];
        if let Some((field, _)) = fields.into_iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(Error::validation(field, "must not be empty"));
        }

        let url = self.endpoint(&["vehicles"])?;
        debug!(vehicle_number = %vehicle.vehicle_number, "creating vehicle");
        self.post(url, vehicle).await
    }

    /// List all vehicles.
    ///
    /// `GET /vehicles`
    pub async fn list_vehicles(&self) -> Result<Vec<Vehicle>, Error> {
        let url = self.endpoint(&["vehicles"])?;
        debug!("listing vehicles");
        let list: VehicleList = self.get(url).await?;
        Ok(list.vehicles)
    }

    /// Report a vehicle position. The backend evaluates geofence crossings
    /// and pushes any resulting alerts over the live channel.
    ///
    /// `POST /vehicles/location`
    pub async fn update_location(
        &self,
        update: &LocationUpdate,
    ) -> Result<LocationUpdateResult, Error> {
        if !(-90.0..=90.0).contains(&update.latitude) {
            return Err(Error::validation("latitude", "must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&update.longitude) {
            return Err(Error::validation("longitude", "must be between -180 and 180"));
        }

        let url = self.endpoint(&["vehicles", "location"])?;
        debug!(
            vehicle_id = %update.vehicle_id,
            lat = update.latitude,
            lon = update.longitude,
            "updating vehicle location"
        );
        self.post(url, update).await
    }

    /// Last known position of a vehicle and the geofences it is inside.
    ///
    /// `GET /vehicles/location/{vehicle_id}`
    pub async fn vehicle_location(&self, vehicle_id: &str) -> Result<VehicleLocation, Error> {
        let url = self.endpoint(&["vehicles", "location", vehicle_id])?;
        debug!(vehicle_id, "fetching vehicle location");
        self.get(url).await
    }
}
