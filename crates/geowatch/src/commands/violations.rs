//! Violation history handler.

use geowatch_api::RestClient;
use geowatch_api::rest::{Violation, ViolationQuery};
use tabled::Tabled;

use crate::cli::{GlobalOpts, OutputFormat, ViolationsArgs};
use crate::error::CliError;
use crate::output;

use super::util::{self, RangeEnd};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ViolationRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Event")]
    event_type: String,
    #[tabled(rename = "Vehicle")]
    vehicle: String,
    #[tabled(rename = "Geofence")]
    geofence: String,
    #[tabled(rename = "Position")]
    position: String,
}

impl From<&Violation> for ViolationRow {
    fn from(v: &Violation) -> Self {
        Self {
            time: util::local_time(v.timestamp),
            event_type: v.event_type.as_str().to_uppercase(),
            vehicle: v.vehicle_number.clone(),
            geofence: v.geofence_name.clone(),
            position: format!("{:.5}, {:.5}", v.latitude, v.longitude),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &RestClient,
    args: ViolationsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let query = ViolationQuery {
        vehicle_id: args.vehicle,
        geofence_id: args.geofence,
        start_date: args
            .from
            .as_deref()
            .map(|raw| util::parse_time_bound("from", raw, RangeEnd::Start))
            .transpose()?,
        end_date: args
            .to
            .as_deref()
            .map(|raw| util::parse_time_bound("to", raw, RangeEnd::End))
            .transpose()?,
        limit: args.limit,
    };

    let page = client.violation_history(&query).await?;
    let out = output::render_list(
        &global.output_format(),
        &page.violations,
        |v| ViolationRow::from(v),
        |v| v.id.clone(),
    )?;
    output::print_output(&out, global.quiet);

    if !global.quiet && matches!(global.output_format(), OutputFormat::Table) {
        eprintln!(
            "{} of {} violation(s)",
            page.violations.len(),
            page.total_count
        );
    }
    Ok(())
}
