//! CLI configuration: thin wrapper around `geowatch_config` shared types.
//!
//! Adds CLI-specific resolution that respects `GlobalOpts` flag overrides
//! (--api-url, --ws-url, --timeout, --insecure).

use clap::ValueEnum;

use geowatch_api::RestClient;
use geowatch_config::ConfigError;
use geowatch_core::AlertsConfig;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use geowatch_config::{Config, Profile, config_path, load_config, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// The active profile with flag overrides applied.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub name: String,
    pub profile: Profile,
    config: Config,
}

impl Resolved {
    /// Pick the profile (flag > `default_profile` > "default") and layer
    /// CLI flags over it.
    pub fn from_global(config: Config, global: &GlobalOpts) -> Result<Self, CliError> {
        let (name, mut profile) =
            config
                .profile(global.profile.as_deref())
                .map_err(|err| match err {
                    ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                        name,
                        available: profile_names(&config),
                    },
                    other => other.into(),
                })?;

        if let Some(ref url) = global.api_url {
            profile.api_url.clone_from(url);
        }
        if let Some(ref url) = global.ws_url {
            profile.ws_url.clone_from(url);
        }
        if let Some(timeout) = global.timeout {
            profile.timeout = Some(timeout);
        }
        if global.insecure {
            profile.insecure = Some(true);
        }

        Ok(Self {
            name,
            profile,
            config,
        })
    }

    /// REST client for the resolved profile.
    pub fn rest_client(&self) -> Result<RestClient, CliError> {
        let base_url = geowatch_config::api_url(&self.profile)?;
        let transport = geowatch_config::transport_config(&self.profile, &self.config.defaults);
        Ok(RestClient::new(base_url, &transport)?)
    }

    /// Live alert settings for the resolved profile.
    pub fn alerts_config(&self) -> Result<AlertsConfig, CliError> {
        Ok(geowatch_config::alerts_config(&self.profile)?)
    }
}

fn profile_names(config: &Config) -> String {
    let mut names: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort_unstable();
    names.join(", ")
}

/// Fill `--output` / `--color` from the config file's `[defaults]` when
/// the flags weren't given. Unparseable values are ignored.
pub fn apply_defaults(global: &mut GlobalOpts, config: &Config) {
    if global.output.is_none() {
        global.output = OutputFormat::from_str(&config.defaults.output, true).ok();
    }
    if global.color.is_none() {
        global.color = ColorMode::from_str(&config.defaults.color, true).ok();
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["geowatch"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["config", "path"]);
        Cli::parse_from(argv).global
    }

    #[test]
    fn flags_override_profile() {
        let resolved = Resolved::from_global(
            Config::default(),
            &global(&["--api-url", "http://fleet:9000", "--ws-url", "ws://fleet:9000/ws/alerts"]),
        )
        .unwrap();

        assert_eq!(resolved.name, "default");
        assert_eq!(resolved.profile.api_url, "http://fleet:9000");
        assert_eq!(
            resolved.alerts_config().unwrap().ws_url.as_str(),
            "ws://fleet:9000/ws/alerts"
        );
    }

    #[test]
    fn unknown_profile_is_a_usage_error() {
        let err = Resolved::from_global(Config::default(), &global(&["--profile", "nope"]))
            .unwrap_err();
        assert!(matches!(err, CliError::ProfileNotFound { ref name, .. } if name == "nope"));
    }

    #[test]
    fn config_defaults_fill_missing_flags() {
        let mut config = Config::default();
        config.defaults.output = "json-compact".into();
        config.defaults.color = "never".into();

        let mut opts = global(&["--color", "always"]);
        apply_defaults(&mut opts, &config);

        assert!(matches!(opts.output_format(), OutputFormat::JsonCompact));
        assert!(matches!(opts.color_mode(), ColorMode::Always));
    }
}
