//! CLI configuration: thin wrapper around `lumen_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--authority, --insecure, --timeout).

use std::time::Duration;

use lumen_core::{ControllerConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use lumen_config::{Config, Defaults, Profile, config_path, load_config, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

/// Comma-separated profile names for diagnostics.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Translate a `Profile` + global flags into a `ControllerConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<ControllerConfig, CliError> {
    let mut merged = profile.clone();
    if let Some(ref authority) = global.authority {
        merged.authority.clone_from(authority);
    }

    let mut config = lumen_config::profile_to_controller_config(&merged, defaults)?;
    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    Ok(config)
}

/// Build a `ControllerConfig` from the config file, profile, and CLI overrides.
pub fn build_controller_config(global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let cfg = load_config()?;
    build_from(&cfg, global)
}

fn build_from(cfg: &Config, global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    if let Some(profile) = cfg.profile(&profile_name) {
        return resolve_profile(profile, &cfg.defaults, global);
    }

    // An explicitly named profile must exist.
    if global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available_profiles(cfg),
        });
    }

    // No profile -- build from --authority / LUMEN_AUTHORITY alone.
    if global.authority.is_none() {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    }
    resolve_profile(&Profile::default(), &cfg.defaults, global)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::{ColorMode, OutputFormat};

    fn global() -> GlobalOpts {
        GlobalOpts {
            profile: None,
            authority: None,
            output: OutputFormat::Table,
            color: ColorMode::Never,
            verbose: 0,
            quiet: false,
            yes: false,
            insecure: false,
            timeout: None,
        }
    }

    fn config_with(name: &str, authority: &str) -> Config {
        let mut cfg = Config::default();
        cfg.default_profile = Some(name.into());
        cfg.profiles.insert(
            name.into(),
            Profile {
                authority: authority.into(),
                timeout: Some(10),
                ..Profile::default()
            },
        );
        cfg
    }

    #[test]
    fn flags_override_profile() {
        let cfg = config_with("home", "http://lights.home:8080");
        let mut g = global();
        g.authority = Some("http://other:9000".into());
        g.insecure = true;
        g.timeout = Some(3);

        let cc = build_from(&cfg, &g).unwrap();
        assert_eq!(cc.url.as_str(), "http://other:9000/");
        assert_eq!(cc.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(cc.timeout, Duration::from_secs(3));
    }

    #[test]
    fn profile_values_apply_without_flags() {
        let cfg = config_with("home", "http://lights.home:8080");
        let cc = build_from(&cfg, &global()).unwrap();
        assert_eq!(cc.url.as_str(), "http://lights.home:8080/");
        assert_eq!(cc.timeout, Duration::from_secs(10));
    }

    #[test]
    fn authority_flag_works_without_profile() {
        let mut g = global();
        g.authority = Some("http://127.0.0.1:8080".into());
        let cc = build_from(&Config::default(), &g).unwrap();
        assert_eq!(cc.url.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(cc.timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_everything_is_no_config() {
        let err = build_from(&Config::default(), &global()).unwrap_err();
        assert!(matches!(err, CliError::NoConfig { .. }), "got {err:?}");
    }

    #[test]
    fn unknown_named_profile_lists_available() {
        let cfg = config_with("home", "http://lights.home:8080");
        let mut g = global();
        g.profile = Some("office".into());
        match build_from(&cfg, &g).unwrap_err() {
            CliError::ProfileNotFound { name, available } => {
                assert_eq!(name, "office");
                assert_eq!(available, "home");
            }
            other => panic!("expected ProfileNotFound, got {other:?}"),
        }
    }
}
