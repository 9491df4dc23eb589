//! Clap derive structures for the `geowatch` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. Kept
//! free of workspace crates so `build.rs` can include it for man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// geowatch -- live geofence alerts and fleet management from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "geowatch",
    version,
    about = "Watch geofence alerts and manage vehicles from the command line",
    long_about = "A terminal dashboard for a geofencing backend.\n\n\
        `geowatch watch` keeps a live alert channel open and reconnects on its own;\n\
        the other commands wrap the backend's REST endpoints.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "GEOWATCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// REST base URL (overrides profile)
    #[arg(long, env = "GEOWATCH_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Live alert channel URL (overrides profile)
    #[arg(long, env = "GEOWATCH_WS_URL", global = true)]
    pub ws_url: Option<String>,

    /// Output format [default: config `defaults.output`, else table]
    #[arg(long, short = 'o', env = "GEOWATCH_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: config `defaults.color`, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "GEOWATCH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "GEOWATCH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "GEOWATCH_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

impl GlobalOpts {
    pub fn output_format(&self) -> OutputFormat {
        self.output.clone().unwrap_or(OutputFormat::Table)
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color.clone().unwrap_or(ColorMode::Auto)
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream live geofence alerts until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Create and list geofences
    #[command(alias = "geo", alias = "g")]
    Geofences(GeofencesArgs),

    /// Register vehicles and report positions
    #[command(alias = "veh")]
    Vehicles(VehiclesArgs),

    /// Configure alert rules
    Alerts(AlertsArgs),

    /// Query recorded boundary crossings
    #[command(alias = "vio")]
    Violations(ViolationsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// How many recent alerts to keep on screen (overrides profile)
    #[arg(long, short = 'r')]
    pub recent: Option<usize>,

    /// Don't seed the recent list from violation history
    #[arg(long)]
    pub no_history: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  GEOFENCES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct GeofencesArgs {
    #[command(subcommand)]
    pub command: GeofencesCommand,
}

#[derive(Debug, Subcommand)]
pub enum GeofencesCommand {
    /// List geofences
    #[command(alias = "ls")]
    List {
        /// Only this category (delivery_zone, restricted_zone, toll_zone, customer_area)
        #[arg(long)]
        category: Option<String>,
    },

    /// Create a geofence from a closed polygon
    Create {
        /// Geofence name
        #[arg(long)]
        name: String,

        /// Free-form description
        #[arg(long, default_value = "")]
        description: String,

        /// Category (delivery_zone, restricted_zone, toll_zone, customer_area)
        #[arg(long)]
        category: String,

        /// Polygon as "lat,lon;lat,lon;..." (first point repeated last)
        #[arg(long, allow_hyphen_values = true)]
        coords: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  VEHICLES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct VehiclesArgs {
    #[command(subcommand)]
    pub command: VehiclesCommand,
}

#[derive(Debug, Subcommand)]
pub enum VehiclesCommand {
    /// List registered vehicles
    #[command(alias = "ls")]
    List,

    /// Register a vehicle
    Create {
        /// Registration / fleet number
        #[arg(long)]
        number: String,

        /// Driver name
        #[arg(long)]
        driver: String,

        /// Vehicle type (truck, van, ...)
        #[arg(long = "type")]
        vehicle_type: String,

        /// Driver phone number
        #[arg(long)]
        phone: String,
    },

    /// Report a vehicle's current position
    Locate {
        /// Vehicle ID
        id: String,

        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// Show a vehicle's last known position and the geofences it is in
    Location {
        /// Vehicle ID
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ALERTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AlertsArgs {
    #[command(subcommand)]
    pub command: AlertsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AlertsCommand {
    /// List configured alert rules
    #[command(alias = "ls")]
    List {
        /// Only rules for this geofence ID
        #[arg(long)]
        geofence: Option<String>,

        /// Only rules for this vehicle ID
        #[arg(long)]
        vehicle: Option<String>,
    },

    /// Create an alert rule
    Configure {
        /// Geofence ID
        #[arg(long)]
        geofence: String,

        /// Which crossings to alert on
        #[arg(long, value_enum)]
        event_type: AlertEvent,

        /// Vehicle ID (omit for every vehicle)
        #[arg(long)]
        vehicle: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AlertEvent {
    Entry,
    Exit,
    Both,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  VIOLATIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ViolationsArgs {
    /// Only this vehicle ID
    #[arg(long)]
    pub vehicle: Option<String>,

    /// Only this geofence ID
    #[arg(long)]
    pub geofence: Option<String>,

    /// Start of range (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// End of range (RFC 3339 or YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub to: Option<String>,

    /// Max records (1-500, default 50)
    #[arg(long, short = 'l')]
    pub limit: Option<u32>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG / COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
