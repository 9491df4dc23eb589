//! Shared helpers for command handlers.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use geowatch_core::CoreError;

use crate::error::CliError;

/// Parse a polygon given as `"lat,lon;lat,lon;..."`.
///
/// Only the syntax is checked here; closure and coordinate ranges are
/// validated by the API client before anything is sent.
pub fn parse_coords(raw: &str) -> Result<Vec<[f64; 2]>, CliError> {
    raw.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (lat, lon) = pair.split_once(',').ok_or_else(|| {
                CliError::validation("coords", format!("'{pair}' is not a lat,lon pair"))
            })?;
            let parse = |v: &str| {
                v.trim().parse::<f64>().map_err(|_| {
                    CliError::validation("coords", format!("'{}' is not a number", v.trim()))
                })
            };
            Ok([parse(lat)?, parse(lon)?])
        })
        .collect()
}

/// Which end of a time range a bound belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEnd {
    Start,
    End,
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date. A bare date
/// covers the whole day: midnight for a start, 23:59:59 for an end.
pub fn parse_time_bound(
    field: &str,
    raw: &str,
    end: RangeEnd,
) -> Result<DateTime<Utc>, CliError> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        CliError::validation(field, format!("'{raw}' is neither RFC 3339 nor YYYY-MM-DD"))
    })?;
    let time = match end {
        RangeEnd::Start => NaiveTime::MIN,
        RangeEnd::End => NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
    };
    Ok(date.and_time(time).and_utc())
}

/// Turn a backend 404 into a "<resource> '<id>' not found" diagnostic that
/// points at the matching list command.
pub fn not_found_as<'a>(
    resource_type: &'a str,
    identifier: &'a str,
    list_command: &'a str,
) -> impl FnOnce(geowatch_api::Error) -> CliError + 'a {
    move |err| match CoreError::from(err) {
        CoreError::NotFound { .. } => CliError::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            list_command: list_command.into(),
        },
        other => other.into(),
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::validation("interactive", format!("prompt failed: {e}")))
}

/// Local wall-clock rendering of a UTC timestamp.
pub fn local_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
