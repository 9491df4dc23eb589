//! Geofence command handlers.

use geowatch_api::RestClient;
use geowatch_api::rest::{Geofence, GeofenceCategory, NewGeofence};
use tabled::Tabled;

use crate::cli::{GeofencesArgs, GeofencesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct GeofenceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Points")]
    points: usize,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&Geofence> for GeofenceRow {
    fn from(g: &Geofence) -> Self {
        Self {
            id: g.id.clone(),
            name: g.name.clone(),
            category: g.category.clone(),
            points: g.coordinates.len(),
            created: util::local_time(g.created_at),
        }
    }
}

fn parse_category(raw: &str) -> Result<GeofenceCategory, CliError> {
    raw.parse()
        .map_err(|reason: String| CliError::validation("category", reason))
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &RestClient,
    args: GeofencesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        GeofencesCommand::List { category } => {
            let category = category.as_deref().map(parse_category).transpose()?;
            let geofences = client.list_geofences(category).await?;
            let out = output::render_list(
                &global.output_format(),
                &geofences,
                |g| GeofenceRow::from(g),
                |g| g.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GeofencesCommand::Create {
            name,
            description,
            category,
            coords,
        } => {
            let geofence = NewGeofence {
                name,
                description,
                category: parse_category(&category)?,
                coordinates: util::parse_coords(&coords)?,
            };
            let created = client.create_geofence(&geofence).await?;
            let out = output::render_single(
                &global.output_format(),
                &created,
                |c| {
                    output::detail_block(&[
                        ("ID", c.id.clone()),
                        ("Name", c.name.clone()),
                        ("Status", c.status.clone()),
                    ])
                },
                |c| c.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
