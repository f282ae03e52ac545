// ── Core error types ──
//
// User-facing errors from lumen-core. Consumers never see reqwest or
// serde errors directly; the `From<lumen_api::Error>` impl translates
// transport-layer failures into domain variants.
//
// An update for an unknown light is not an error. It is reported as
// `UpdateOutcome::UnknownTarget` and counted by the registry.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    /// The authority could not be reached (DNS, refused, TLS, stream).
    #[error("Cannot connect to authority at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Controller disconnected")]
    ControllerDisconnected,

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Request errors ───────────────────────────────────────────────
    /// The authority answered with a non-success status.
    #[error("Authority rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// A response body did not have the expected shape.
    #[error("Malformed payload from authority: {message}")]
    MalformedPayload { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Light not found: {identifier}")]
    LightNotFound { identifier: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` for failures that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => true,
            Self::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<lumen_api::Error> for CoreError {
    fn from(err: lumen_api::Error) -> Self {
        match err {
            lumen_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            lumen_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            lumen_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            lumen_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            lumen_api::Error::Http { status, message } => CoreError::Rejected { status, message },
            lumen_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            lumen_api::Error::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket closed (code {code}): {reason}"),
            },
            lumen_api::Error::Deserialization { message, body: _ } => {
                CoreError::MalformedPayload { message }
            }
        }
    }
}
