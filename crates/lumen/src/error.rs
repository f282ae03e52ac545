//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use lumen_config::ConfigError;
use lumen_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to authority at {url}")]
    #[diagnostic(
        code(lumen::connection_failed),
        help(
            "Check that the authority is running and reachable.\n\
             For self-signed certificates use --insecure (-k) or set ca_cert in your profile.\n\
             Try: lumen lights list --authority <url>"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(lumen::timeout),
        help("Increase timeout with --timeout or check authority responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Authority responses ──────────────────────────────────────────

    #[error("Authority rejected the request (HTTP {status}): {message}")]
    #[diagnostic(code(lumen::rejected))]
    Rejected { status: u16, message: String },

    #[error("Authority sent an unexpected payload: {message}")]
    #[diagnostic(
        code(lumen::malformed_payload),
        help("Check that --authority points at a light authority, not another service.")
    )]
    MalformedPayload { message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(lumen::not_found),
        help("Run: lumen {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(lumen::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(lumen::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: lumen config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No authority configured")]
    #[diagnostic(
        code(lumen::no_config),
        help(
            "Create a profile with: lumen config init\n\
             Or pass --authority <url> (LUMEN_AUTHORITY).\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(lumen::config))]
    Config(Box<figment::Error>),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(lumen::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Internal / IO ────────────────────────────────────────────────

    #[error("Internal error: {0}")]
    #[diagnostic(code(lumen::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } | Self::Rejected { status: 404, .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } | Self::MalformedPayload { .. } => exit_code::REJECTED,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::ProfileNotFound { .. }
            | Self::NoConfig { .. }
            | Self::Config(_) => exit_code::USAGE,
            Self::Internal(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::ControllerDisconnected => CliError::ConnectionFailed {
                url: "(disconnected)".into(),
                source: "Controller connection was closed".into(),
            },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Rejected { status, message } => CliError::Rejected { status, message },

            CoreError::MalformedPayload { message } => CliError::MalformedPayload { message },

            CoreError::LightNotFound { identifier } => CliError::NotFound {
                resource_type: "light".into(),
                identifier,
                list_command: "lights list".into(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name, path: _ } => CliError::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            ConfigError::Serialization(e) => CliError::Internal(e.to_string()),
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
