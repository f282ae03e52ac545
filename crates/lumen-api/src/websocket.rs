//! WebSocket update stream with auto-reconnect.
//!
//! Connects to the authority's `/messages` endpoint and delivers lifecycle
//! notifications and parsed [`StateUpdateEvent`]s, in transport order,
//! through a single [`tokio::sync::mpsc`] channel. Abnormal closures are
//! retried with exponential backoff + jitter; a normal closure (code 1000)
//! or an explicit [`shutdown`](StreamHandle::shutdown) ends the loop.
//!
//! # Example
//!
//! ```rust,ignore
//! use lumen_api::websocket::{StreamEvent, StreamHandle, StreamOptions};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let url = Url::parse("ws://192.168.1.20:8080/messages")?;
//! let (handle, mut events) = StreamHandle::connect(url, StreamOptions::default(), CancellationToken::new());
//!
//! while let Some(event) = events.recv().await {
//!     if let StreamEvent::Message(update) = event {
//!         println!("{}/{} changed", update.group_id, update.light_id);
//!     }
//! }
//!
//! handle.shutdown();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::models::StateUpdateEvent;

/// Path of the update stream relative to the authority root.
pub const STREAM_PATH: &str = "messages";

const CLOSE_NORMAL: u16 = 1000;
const CLOSE_NO_STATUS: u16 = 1005;
const CLOSE_ABNORMAL: u16 = 1006;

// ── StreamEvent ──────────────────────────────────────────────────────

/// Everything the stream reports, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Handshake completed.
    Opened { url: Url },

    /// The connection closed. `normal` is `true` only for close code 1000
    /// (including our own shutdown); anything else is eligible for reconnect.
    Closed {
        code: u16,
        reason: String,
        normal: bool,
    },

    /// A connection or transport failure. Always followed by `Closed`.
    Error { message: String },

    /// A validated update pushed by the authority.
    Message(StateUpdateEvent),
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for stream reconnection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum consecutive reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

/// Stream behaviour options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    /// Re-establish the stream after any closure other than code 1000.
    pub reconnect_on_abnormal_close: bool,
    pub backoff: ReconnectConfig,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            reconnect_on_abnormal_close: true,
            backoff: ReconnectConfig::default(),
        }
    }
}

// ── StreamHandle ─────────────────────────────────────────────────────

/// Handle to a running update stream.
///
/// Dropping the handle does not stop the background task; call
/// [`shutdown`](Self::shutdown) or cancel the token passed to `connect`.
pub struct StreamHandle {
    cancel: CancellationToken,
    malformed: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Spawn the connection loop and return immediately.
    ///
    /// Never fails: the first connection attempt happens in the background
    /// and failures surface as [`StreamEvent::Error`] / [`StreamEvent::Closed`]
    /// on the returned receiver.
    pub fn connect(
        url: Url,
        options: StreamOptions,
        cancel: CancellationToken,
    ) -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let malformed = Arc::new(AtomicU64::new(0));

        let task_cancel = cancel.clone();
        let task_malformed = Arc::clone(&malformed);
        let task = tokio::spawn(async move {
            stream_loop(url, event_tx, options, task_cancel, task_malformed).await;
        });

        (
            Self {
                cancel,
                malformed,
                task,
            },
            event_rx,
        )
    }

    /// Close the stream intentionally. Suppresses reconnection.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Number of inbound frames dropped because they were not valid updates.
    pub fn malformed_count(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    /// Wait for the background loop to exit.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "update stream task panicked");
        }
    }
}

/// Derive the stream URL from the authority base URL.
///
/// `https` maps to `wss`, `http` to `ws`; host, port and any base path
/// prefix are kept, and `/messages` is appended.
pub fn stream_url(base: &Url) -> Result<Url, Error> {
    let scheme = match base.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(Error::WebSocketConnect(format!(
                "unsupported authority scheme '{other}'"
            )));
        }
    };

    let mut url = base.clone();
    url.set_scheme(scheme)
        .map_err(|()| Error::WebSocketConnect(format!("cannot derive {scheme} URL from {base}")))?;
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .push(STREAM_PATH);
    Ok(url)
}

// ── Background reconnection loop ─────────────────────────────────────

/// How a single connection ended.
#[derive(Debug)]
enum SessionEnd {
    /// Our token was cancelled.
    Cancelled { opened: bool },
    /// The event receiver was dropped; nobody is listening.
    ReceiverGone,
    /// Close frame received, or the stream ended without one.
    Closed { code: u16, reason: String },
    /// Handshake or transport failure.
    Failed { error: Error, opened: bool },
}

/// Main loop: connect → read → on abnormal close, backoff → reconnect.
async fn stream_loop(
    url: Url,
    event_tx: mpsc::UnboundedSender<StreamEvent>,
    options: StreamOptions,
    cancel: CancellationToken,
    malformed: Arc<AtomicU64>,
) {
    let mut attempt: u32 = 0;

    loop {
        let end = connect_and_read(&url, &event_tx, &cancel, &malformed).await;

        let (code, reason, opened) = match end {
            SessionEnd::ReceiverGone => {
                tracing::debug!("update stream receiver dropped");
                break;
            }
            SessionEnd::Cancelled { opened } => {
                if opened {
                    let _ = event_tx.send(StreamEvent::Closed {
                        code: CLOSE_NORMAL,
                        reason: "client shutdown".into(),
                        normal: true,
                    });
                }
                break;
            }
            SessionEnd::Closed { code, reason } => (code, reason, true),
            SessionEnd::Failed { error, opened } => {
                tracing::warn!(error = %error, attempt, "update stream error");
                let message = error.to_string();
                let _ = event_tx.send(StreamEvent::Error {
                    message: message.clone(),
                });
                (CLOSE_ABNORMAL, message, opened)
            }
        };

        let normal = code == CLOSE_NORMAL;
        if event_tx
            .send(StreamEvent::Closed {
                code,
                reason: reason.clone(),
                normal,
            })
            .is_err()
        {
            break;
        }

        if normal {
            tracing::info!(reason = %reason, "update stream closed normally");
            break;
        }
        if !options.reconnect_on_abnormal_close {
            tracing::info!(code, "update stream closed abnormally, reconnect disabled");
            break;
        }

        // A session that got as far as the handshake resets the backoff.
        if opened {
            attempt = 0;
        }

        if let Some(max) = options.backoff.max_retries {
            if attempt >= max {
                tracing::error!(max_retries = max, "update stream reconnection limit reached, giving up");
                break;
            }
        }

        let delay = calculate_backoff(attempt, &options.backoff);
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "Waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }

        attempt = attempt.saturating_add(1);
    }

    tracing::debug!("update stream loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish a single connection and read frames until it drops.
async fn connect_and_read(
    url: &Url,
    event_tx: &mpsc::UnboundedSender<StreamEvent>,
    cancel: &CancellationToken,
    malformed: &AtomicU64,
) -> SessionEnd {
    tracing::info!(url = %url, "Connecting to update stream");

    let connected = tokio::select! {
        biased;
        () = cancel.cancelled() => return SessionEnd::Cancelled { opened: false },
        result = tokio_tungstenite::connect_async(url.as_str()) => result,
    };

    let ws_stream = match connected {
        Ok((stream, _response)) => stream,
        Err(e) => {
            return SessionEnd::Failed {
                error: Error::WebSocketConnect(e.to_string()),
                opened: false,
            };
        }
    };

    tracing::info!("update stream connected");
    if event_tx
        .send(StreamEvent::Opened { url: url.clone() })
        .is_err()
    {
        return SessionEnd::ReceiverGone;
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "client shutdown".into(),
                };
                if let Err(e) = write.send(Message::Close(Some(frame))).await {
                    tracing::debug!(error = %e, "failed to send close frame");
                }
                return SessionEnd::Cancelled { opened: true };
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(update) = parse_frame(text.as_str(), malformed) {
                            if event_tx.send(StreamEvent::Message(update)).is_err() {
                                return SessionEnd::ReceiverGone;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // tungstenite queues the pong reply itself
                        tracing::trace!("update stream ping");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame.map_or_else(
                            || (CLOSE_NO_STATUS, String::new()),
                            |cf| (u16::from(cf.code), cf.reason.as_str().to_owned()),
                        );
                        tracing::info!(code, reason = %reason, "update stream close frame received");
                        return SessionEnd::Closed { code, reason };
                    }
                    Some(Err(e)) => {
                        return SessionEnd::Failed {
                            error: Error::WebSocketClosed {
                                code: CLOSE_ABNORMAL,
                                reason: e.to_string(),
                            },
                            opened: true,
                        };
                    }
                    None => {
                        tracing::info!("update stream ended without close frame");
                        return SessionEnd::Closed {
                            code: CLOSE_ABNORMAL,
                            reason: "stream ended without close frame".into(),
                        };
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

// ── Message parsing ──────────────────────────────────────────────────

/// Parse a text frame into an update, counting and logging anything else.
fn parse_frame(text: &str, malformed: &AtomicU64) -> Option<StateUpdateEvent> {
    match serde_json::from_str::<StateUpdateEvent>(text) {
        Ok(update) => Some(update),
        Err(e) => {
            malformed.fetch_add(1, Ordering::Relaxed);
            let preview: String = text.chars().take(120).collect();
            tracing::warn!(error = %e, payload = %preview, "dropping malformed stream payload");
            None
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 +- 0.25)`
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
