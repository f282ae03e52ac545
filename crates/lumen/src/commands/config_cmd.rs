//! Config subcommand handlers.

use dialoguer::{Confirm, Input};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Helpers ─────────────────────────────────────────────────────────

/// The config as it would be saved to disk.
fn format_config(cfg: &Config) -> Result<String, CliError> {
    let text = toml::to_string_pretty(cfg).map_err(|e| CliError::Internal(e.to_string()))?;
    Ok(text.trim_end().to_owned())
}

fn parse_flag<T: std::str::FromStr>(field: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {expected}"),
    })
}

/// Apply `key = value` to a profile.
fn set_profile_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "authority" => {
            lumen_config::parse_authority(&value)?;
            profile.authority = value;
        }
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "insecure" => profile.insecure = Some(parse_flag(key, &value, "'true' or 'false'")?),
        "timeout" => profile.timeout = Some(parse_flag(key, &value, "a number (seconds)")?),
        "stream" => profile.stream = Some(parse_flag(key, &value, "'true' or 'false'")?),
        "reconnect" => profile.reconnect = Some(parse_flag(key, &value, "'true' or 'false'")?),
        "refresh_interval" | "refresh-interval" => {
            profile.refresh_interval = Some(parse_flag(key, &value, "a number (seconds)")?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: authority, ca_cert, insecure, \
                     timeout, stream, reconnect, refresh_interval"
                ),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: wizard, or non-interactive with --authority ───────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            let mut cfg = config::load_config()?;

            let (profile_name, authority, insecure) = match global.authority {
                Some(ref authority) => (
                    global.profile.clone().unwrap_or_else(|| "default".into()),
                    authority.clone(),
                    global.insecure,
                ),
                None if util::interactive() => {
                    eprintln!("lumen configuration wizard");
                    eprintln!("   Config path: {}\n", config_path.display());

                    let name: String = Input::new()
                        .with_prompt("Profile name")
                        .default(global.profile.clone().unwrap_or_else(|| "default".into()))
                        .interact_text()
                        .map_err(util::prompt_err)?;
                    let authority: String = Input::new()
                        .with_prompt("Authority URL")
                        .default("http://127.0.0.1:8080".into())
                        .interact_text()
                        .map_err(util::prompt_err)?;
                    let insecure = Confirm::new()
                        .with_prompt("Accept self-signed certificates?")
                        .default(false)
                        .interact()
                        .map_err(util::prompt_err)?;
                    (name, authority, insecure)
                }
                None => {
                    return Err(CliError::Validation {
                        field: "authority".into(),
                        reason: "pass --authority when not running interactively".into(),
                    });
                }
            };

            lumen_config::parse_authority(&authority)?;
            let profile = Profile {
                authority,
                insecure: insecure.then_some(true),
                ..Profile::default()
            };
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());

            let path = config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Configuration written to {}", path.display());
                eprintln!("  Active profile: {profile_name}");
                eprintln!("\n  Test it: lumen lights list");
            }
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = match global.output {
                OutputFormat::Table => format_config(&cfg)?,
                ref format => output::render_single(format, &cfg, |_| String::new(), |c| {
                    c.default_profile_name().to_owned()
                }),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            set_profile_key(profile, &key, value)?;
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Set {key} on profile '{profile_name}'");
            }
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: lumen config init");
                return Ok(());
            }
            let default = cfg.default_profile_name();
            for name in cfg.profiles.keys() {
                let marker = if name == default { " *" } else { "" };
                println!("{name}{marker}");
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }
    }
}
