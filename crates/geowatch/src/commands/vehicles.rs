//! Vehicle command handlers.

use chrono::Utc;
use geowatch_api::RestClient;
use geowatch_api::rest::{GeofenceStatus, LocationUpdate, NewVehicle, Vehicle};
use tabled::Tabled;

use crate::cli::{GlobalOpts, VehiclesArgs, VehiclesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct VehicleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Number")]
    number: String,
    #[tabled(rename = "Driver")]
    driver: String,
    #[tabled(rename = "Type")]
    vehicle_type: String,
    #[tabled(rename = "Phone")]
    phone: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Vehicle> for VehicleRow {
    fn from(v: &Vehicle) -> Self {
        Self {
            id: v.id.clone(),
            number: v.vehicle_number.clone(),
            driver: v.driver_name.clone(),
            vehicle_type: v.vehicle_type.clone(),
            phone: v.phone.clone(),
            status: v.status.clone(),
        }
    }
}

fn geofence_names(geofences: &[GeofenceStatus]) -> String {
    if geofences.is_empty() {
        return "-".into();
    }
    geofences
        .iter()
        .map(|g| g.geofence_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &RestClient,
    args: VehiclesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let format = global.output_format();

    match args.command {
        VehiclesCommand::List => {
            let vehicles = client.list_vehicles().await?;
            let out = output::render_list(
                &format,
                &vehicles,
                |v| VehicleRow::from(v),
                |v| v.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        VehiclesCommand::Create {
            number,
            driver,
            vehicle_type,
            phone,
        } => {
            let created = client
                .create_vehicle(&NewVehicle {
                    vehicle_number: number,
                    driver_name: driver,
                    vehicle_type,
                    phone,
                })
                .await?;
            let out = output::render_single(
                &format,
                &created,
                |c| {
                    output::detail_block(&[
                        ("ID", c.id.clone()),
                        ("Number", c.vehicle_number.clone()),
                        ("Status", c.status.clone()),
                    ])
                },
                |c| c.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        VehiclesCommand::Locate { id, lat, lon } => {
            let update = LocationUpdate {
                vehicle_id: id.clone(),
                latitude: lat,
                longitude: lon,
                timestamp: Utc::now(),
            };
            let result = client
                .update_location(&update)
                .await
                .map_err(util::not_found_as("vehicle", &id, "vehicles list"))?;
            let out = output::render_single(
                &format,
                &result,
                |r| {
                    output::detail_block(&[
                        ("Vehicle", r.vehicle_id.clone()),
                        ("Updated", r.location_updated.to_string()),
                        ("Inside", geofence_names(&r.current_geofences)),
                    ])
                },
                |r| r.vehicle_id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        VehiclesCommand::Location { id } => {
            let location = client
                .vehicle_location(&id)
                .await
                .map_err(util::not_found_as("vehicle", &id, "vehicles list"))?;
            let out = output::render_single(
                &format,
                &location,
                |l| {
                    let fix = &l.current_location;
                    output::detail_block(&[
                        ("Vehicle", l.vehicle_id.clone()),
                        ("Number", l.vehicle_number.clone()),
                        ("Position", format!("{:.6}, {:.6}", fix.latitude, fix.longitude)),
                        ("Seen", util::local_time(fix.timestamp)),
                        ("Inside", geofence_names(&l.current_geofences)),
                    ])
                },
                |l| format!("{},{}", l.current_location.latitude, l.current_location.longitude),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
