//! Config subcommand handlers.

use dialoguer::Input;
use url::Url;

use geowatch_config::DEFAULT_API_URL;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::validation("interactive", format!("prompt failed: {e}"))
}

/// The backend serves the live channel at `/ws/alerts` on the same host.
fn default_ws_url(api_url: &str) -> String {
    let Ok(mut url) = Url::parse(api_url) else {
        return geowatch_core::config::DEFAULT_WS_URL.into();
    };
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    if url.set_scheme(scheme).is_err() {
        return geowatch_core::config::DEFAULT_WS_URL.into();
    }
    url.set_path("/ws/alerts");
    url.set_query(None);
    url.to_string()
}

fn render_toml(cfg: &Config) -> Result<String, CliError> {
    toml::to_string_pretty(cfg).map_err(|e| CliError::Render {
        format: "toml",
        reason: e.to_string(),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, cfg: Config, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("geowatch configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            if cfg.profiles.contains_key(&profile_name)
                && !util::confirm(
                    &format!("Profile '{profile_name}' exists. Overwrite?"),
                    global.yes,
                )?
            {
                return Ok(());
            }

            let api_url: String = Input::new()
                .with_prompt("Backend REST URL")
                .default(DEFAULT_API_URL.into())
                .interact_text()
                .map_err(prompt_err)?;

            let ws_url: String = Input::new()
                .with_prompt("Live alert channel URL")
                .default(default_ws_url(&api_url))
                .interact_text()
                .map_err(prompt_err)?;

            let profile = Profile {
                api_url,
                ws_url,
                ..Profile::default()
            };
            // Reject bad URLs before anything is written.
            geowatch_config::api_url(&profile)?;
            geowatch_config::alerts_config(&profile)?;

            let mut cfg = cfg;
            if cfg.default_profile.is_none() || cfg.profiles.is_empty() {
                cfg.default_profile = Some(profile_name.clone());
            }
            cfg.profiles.insert(profile_name.clone(), profile);

            let path = config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("   Saved profile '{profile_name}' to {}", path.display());
            }
            Ok(())
        }

        // ── Show: print resolved config ─────────────────────────────
        ConfigCommand::Show => {
            let out = output::render_single(
                &global.output_format(),
                &cfg,
                |c| render_toml(c).unwrap_or_else(|e| e.to_string()),
                |c| c.default_profile.clone().unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path: print config file location ────────────────────────
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}
