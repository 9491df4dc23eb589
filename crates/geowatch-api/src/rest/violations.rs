// Violation history endpoint

use tracing::debug;

use crate::error::Error;
use crate::rest::client::RestClient;
use crate::rest::models::{ViolationPage, ViolationQuery};

/// Page size the backend uses when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Largest page the backend will return; bigger limits are clamped.
pub const MAX_HISTORY_LIMIT: u32 = 500;

impl RestClient {
    /// Query recorded geofence crossings, newest first.
    ///
    /// `GET /violations/history`
    pub async fn violation_history(&self, query: &ViolationQuery) -> Result<ViolationPage, Error> {
        if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
            if start > end {
                return Err(Error::validation("start_date", "must not be after end_date"));
            }
        }

        let mut url = self.endpoint(&["violations", "history"])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(id) = &query.vehicle_id {
                pairs.append_pair("vehicle_id", id);
            }
            if let Some(id) = &query.geofence_id {
                pairs.append_pair("geofence_id", id);
            }
            if let Some(start) = query.start_date {
                pairs.append_pair("start_date", &start.to_rfc3339());
            }
            if let Some(end) = query.end_date {
                pairs.append_pair("end_date", &end.to_rfc3339());
            }
            let limit = query
                .limit
                .unwrap_or(DEFAULT_HISTORY_LIMIT)
                .min(MAX_HISTORY_LIMIT);
            pairs.append_pair("limit", &limit.to_string());
        }

        debug!(?query, "fetching violation history");
        self.get(url).await
    }
}
