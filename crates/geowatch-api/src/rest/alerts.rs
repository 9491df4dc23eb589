// Alert rule endpoints

use serde::Deserialize;
use tracing::debug;

use crate::error::Error;
use crate::rest::client::RestClient;
use crate::rest::models::{AlertRule, AlertRuleRequest, ConfiguredAlert};

#[derive(Deserialize)]
struct AlertList {
    alerts: Vec<AlertRule>,
}

impl RestClient {
    /// Create an alert rule for a geofence.
    ///
    /// `POST /alerts/configure`
    pub async fn configure_alert(&self, rule: &AlertRuleRequest) -> Result<ConfiguredAlert, Error> {
        let url = self.endpoint(&["alerts", "configure"])?;
        debug!(
            geofence_id = %rule.geofence_id,
            vehicle_id = ?rule.vehicle_id,
            trigger = %rule.event_type,
            "configuring alert"
        );
        self.post(url, rule).await
    }

    /// List alert rules, optionally filtered by geofence and/or vehicle.
    ///
    /// `GET /alerts[?geofence_id=...&vehicle_id=...]`
    pub async fn list_alerts(
        &self,
        geofence_id: Option<&str>,
        vehicle_id: Option<&str>,
    ) -> Result<Vec<AlertRule>, Error> {
        let mut url = self.endpoint(&["alerts"])?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(id) = geofence_id {
                query.append_pair("geofence_id", id);
            }
            if let Some(id) = vehicle_id {
                query.append_pair("vehicle_id", id);
            }
        }
        // `query_pairs_mut` leaves a bare `?` behind when nothing was added
        if url.query() == Some("") {
            url.set_query(None);
        }
        debug!(?geofence_id, ?vehicle_id, "listing alerts");
        let list: AlertList = self.get(url).await?;
        Ok(list.alerts)
    }
}
