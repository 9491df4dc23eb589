//! Alert rule command handlers.

use geowatch_api::RestClient;
use geowatch_api::rest::{AlertRule, AlertRuleRequest, AlertTrigger};
use tabled::Tabled;

use crate::cli::{AlertEvent, AlertsArgs, AlertsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Geofence")]
    geofence: String,
    #[tabled(rename = "Vehicle")]
    vehicle: String,
    #[tabled(rename = "On")]
    event_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&AlertRule> for AlertRow {
    fn from(a: &AlertRule) -> Self {
        Self {
            id: a.alert_id.clone(),
            geofence: a.geofence_name.clone(),
            vehicle: a
                .vehicle_number
                .clone()
                .unwrap_or_else(|| "(all)".into()),
            event_type: a.event_type.clone(),
            status: a.status.clone(),
            created: util::local_time(a.created_at),
        }
    }
}

impl From<AlertEvent> for AlertTrigger {
    fn from(event: AlertEvent) -> Self {
        match event {
            AlertEvent::Entry => Self::Entry,
            AlertEvent::Exit => Self::Exit,
            AlertEvent::Both => Self::Both,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &RestClient,
    args: AlertsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        AlertsCommand::List { geofence, vehicle } => {
            let rules = client
                .list_alerts(geofence.as_deref(), vehicle.as_deref())
                .await?;
            let out = output::render_list(
                &global.output_format(),
                &rules,
                |a| AlertRow::from(a),
                |a| a.alert_id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AlertsCommand::Configure {
            geofence,
            event_type,
            vehicle,
        } => {
            let rule = AlertRuleRequest {
                geofence_id: geofence,
                vehicle_id: vehicle,
                event_type: event_type.into(),
            };
            let configured = client.configure_alert(&rule).await?;
            let out = output::render_single(
                &global.output_format(),
                &configured,
                |c| {
                    output::detail_block(&[
                        ("ID", c.alert_id.clone()),
                        ("Geofence", c.geofence_id.clone()),
                        ("Vehicle", c.vehicle_id.clone().unwrap_or_else(|| "(all)".into())),
                        ("On", c.event_type.clone()),
                        ("Status", c.status.clone()),
                    ])
                },
                |c| c.alert_id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
