//! Live alert view: keeps the push channel open and prints one line per
//! event until Ctrl-C.
//!
//! Hub callbacks and connection notices run on the connection task, so
//! they only forward into a channel; all rendering happens here.

use std::sync::Arc;

use geowatch_api::GeofenceEvent;
use geowatch_api::rest::ViolationQuery;
use geowatch_core::{
    AlertsConfig, HubState, LiveAlerts, Notice, RecentEvents, Toast, ToastFeed, UnreadCounter,
};
use tokio::sync::mpsc;

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output::{self, Palette};

use super::util;

enum Update {
    State(HubState),
    Notice(Notice),
}

// ── Dashboard ───────────────────────────────────────────────────────

/// Terminal rendering state for one `watch` session. Each update returns
/// the lines to print; the handler does the printing.
struct Dashboard {
    palette: Palette,
    /// `Some(compact)` in JSON mode: one event object per line, nothing else.
    json: Option<bool>,
    quiet: bool,
    retry_secs: f64,
    connected: Option<bool>,
    toasts: ToastFeed,
    unread: UnreadCounter,
    recent: RecentEvents,
}

impl Dashboard {
    fn new(global: &GlobalOpts, config: &AlertsConfig, recent: RecentEvents) -> Self {
        let json = match global.output_format() {
            OutputFormat::Json => Some(false),
            OutputFormat::JsonCompact => Some(true),
            _ => None,
        };
        Self::with_options(
            Palette::new(&global.color_mode()),
            json,
            global.quiet,
            config.retry_delay.as_secs_f64(),
            recent,
        )
    }

    fn with_options(
        palette: Palette,
        json: Option<bool>,
        quiet: bool,
        retry_secs: f64,
        recent: RecentEvents,
    ) -> Self {
        Self {
            palette,
            json,
            quiet,
            retry_secs,
            connected: None,
            toasts: ToastFeed::new(),
            unread: UnreadCounter::new(),
            recent,
        }
    }

    fn is_human(&self) -> bool {
        self.json.is_none() && !self.quiet
    }

    /// Lines shown before the channel opens.
    fn header(&self) -> Vec<String> {
        if self.is_human() && !self.recent.is_empty() {
            vec![self.recent_block()]
        } else {
            Vec::new()
        }
    }

    fn on_notice(&self, notice: &Notice) -> Vec<String> {
        if self.is_human() {
            vec![self.palette.good(&format!("✓ {notice}"))]
        } else {
            Vec::new()
        }
    }

    fn on_state(&mut self, state: &HubState) -> Result<Vec<String>, CliError> {
        let mut lines = Vec::new();
        lines.extend(self.on_connectivity(state.is_connected));

        let toast = self.toasts.observe(state);
        self.unread.observe(state);
        let recent_changed = self.recent.observe(state);

        let (Some(toast), Some(event)) = (toast, state.last_event.as_deref()) else {
            return Ok(lines);
        };

        if let Some(compact) = self.json {
            lines.push(output::render_json(event, compact)?);
            return Ok(lines);
        }

        lines.push(self.toast_line(&toast, event));
        if recent_changed && !self.quiet {
            lines.push(self.recent_block());
        }
        Ok(lines)
    }

    fn on_connectivity(&mut self, connected: bool) -> Option<String> {
        let previous = self.connected.replace(connected);
        if previous == Some(connected) || !self.is_human() {
            return None;
        }
        match (previous, connected) {
            (None, false) => Some(self.palette.dim("○ connecting…")),
            (Some(true), false) => Some(self.palette.bad(&format!(
                "○ live channel lost, retrying every {}s",
                self.retry_secs
            ))),
            // The connected notice covers the transition to true.
            _ => None,
        }
    }

    fn toast_line(&self, toast: &Toast, event: &GeofenceEvent) -> String {
        let time = event
            .detected_at()
            .map_or_else(|| event.timestamp.clone(), util::local_time);
        format!(
            "{} {}  {}",
            self.palette.dim(&format!("[{time}]")),
            self.palette.severity(toast.severity, &toast.message),
            self.palette.dim(&format!("(unread: {})", self.unread.count())),
        )
    }

    fn recent_block(&self) -> String {
        let lines: Vec<String> = self
            .recent
            .iter()
            .map(|e| {
                format!(
                    "    {:<5} {} @ {}",
                    e.event_type.as_str().to_uppercase(),
                    e.vehicle.vehicle_number,
                    e.geofence.geofence_name
                )
            })
            .collect();
        format!(
            "{}\n{}",
            self.palette
                .dim(&format!("  recent ({}/{}):", self.recent.len(), self.recent.capacity())),
            lines.join("\n")
        )
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        output::print_output(line, false);
    }
}

// ── History seed ────────────────────────────────────────────────────

/// Best-effort: the live view works without history, so failures are
/// reported and skipped.
async fn seed_recent(resolved: &Resolved, recent: &mut RecentEvents) {
    let limit = u32::try_from(recent.capacity()).unwrap_or(u32::MAX);
    let query = ViolationQuery {
        limit: Some(limit),
        ..ViolationQuery::default()
    };

    let client = match resolved.rest_client() {
        Ok(client) => client,
        Err(err) => {
            tracing::warn!(error = %err, "could not build REST client; recent list starts empty");
            return;
        }
    };
    match client.violation_history(&query).await {
        Ok(page) => recent.seed(page.violations.into_iter().map(GeofenceEvent::from)),
        // Backend without a history endpoint: nothing to seed.
        Err(err) if err.is_not_found() => {
            tracing::debug!(error = %err, "violation history not available");
        }
        Err(err) if err.is_transient() => {
            tracing::warn!(error = %err, "backend unreachable; recent list starts empty");
        }
        Err(err) => tracing::warn!(error = %err, "could not load recent violations"),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    resolved: &Resolved,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut alerts = resolved.alerts_config()?;
    if let Some(recent) = args.recent {
        if recent == 0 {
            return Err(CliError::validation("recent", "must be at least 1"));
        }
        alerts.recent_capacity = recent;
    }

    let mut recent = RecentEvents::new(alerts.recent_capacity);
    if !args.no_history {
        seed_recent(resolved, &mut recent).await;
    }

    let mut dashboard = Dashboard::new(global, &alerts, recent);
    print_lines(&dashboard.header());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let notices = tx.clone();
    let live = LiveAlerts::new(alerts).with_notifier(Arc::new(move |notice: &Notice| {
        let _ = notices.send(Update::Notice(notice.clone()));
    }));
    let _subscription = live.subscribe(move |state| {
        let _ = tx.send(Update::State(state.clone()));
    });

    tracing::info!(url = %live.config().ws_url, "starting live alert view");
    live.start();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            biased;

            signal = &mut ctrl_c => break signal.map_err(CliError::from),

            Some(update) = rx.recv() => {
                let rendered = match update {
                    Update::State(state) => dashboard.on_state(&state),
                    Update::Notice(notice) => Ok(dashboard.on_notice(&notice)),
                };
                match rendered {
                    Ok(lines) => print_lines(&lines),
                    Err(err) => break Err(err),
                }
            }

            else => break Ok(()),
        }
    };

    live.shutdown().await;
    if dashboard.is_human() {
        eprintln!("stopped after {} alert(s)", dashboard.unread.count());
    }
    outcome
}
