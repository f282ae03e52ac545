// ── Runtime connection configuration ──
//
// These types describe *how* to reach a light authority. They never
// touch disk: the CLI builds a `ControllerConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use lumen_api::transport::{TlsMode, TransportConfig};
use lumen_api::websocket::{ReconnectConfig, StreamOptions};
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed authorities).
    DangerAcceptInvalid,
}

/// Configuration for talking to a single authority.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Authority base URL (e.g., `http://192.168.1.20:8080`).
    pub url: Url,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Open the WebSocket update stream on connect.
    pub stream_enabled: bool,
    /// Re-open the stream after any closure other than code 1000.
    pub reconnect_on_abnormal_close: bool,
    /// Backoff for stream reconnection.
    pub reconnect: ReconnectConfig,
    /// How often to perform a full refresh (seconds). 0 = never.
    pub refresh_interval_secs: u64,
}

impl ControllerConfig {
    /// Defaults for everything except the authority URL.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            stream_enabled: true,
            reconnect_on_abnormal_close: true,
            reconnect: ReconnectConfig::default(),
            refresh_interval_secs: 0,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }

    pub(crate) fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            reconnect_on_abnormal_close: self.reconnect_on_abnormal_close,
            backoff: self.reconnect.clone(),
        }
    }
}
