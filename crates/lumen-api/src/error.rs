use thiserror::Error;

/// Top-level error type for the `lumen-api` crate.
///
/// Covers every failure mode of both channels: the request/response HTTP
/// API and the WebSocket update stream. `lumen-core` maps these into
/// domain-level errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── HTTP API ────────────────────────────────────────────────────
    /// The authority answered with a non-2xx status.
    #[error("Authority rejected request (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::WebSocketConnect(_) | Self::WebSocketClosed { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Http { status: 404, .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Http {
            status: 503,
            message: "busy".into(),
        };
        assert!(err.is_transient());
        assert!(!err.is_not_found());
    }

    #[test]
    fn client_errors_are_not_transient() {
        let err = Error::Http {
            status: 404,
            message: "no such light".into(),
        };
        assert!(!err.is_transient());
        assert!(err.is_not_found());
    }

    #[test]
    fn deserialization_is_not_transient() {
        let err = Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        };
        assert!(!err.is_transient());
        assert!(!err.is_not_found());
    }
}
