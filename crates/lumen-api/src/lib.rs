// lumen-api: Async Rust client for a light authority's HTTP API and update stream

pub mod client;
pub mod error;
pub mod models;
pub mod transport;
pub mod websocket;

pub use client::LightsClient;
pub use error::Error;
pub use models::{ApiLight, CreateLightRequest, Ident, LightsResponse, StateRequest, StateUpdateEvent};
pub use transport::{TlsMode, TransportConfig};
pub use websocket::{ReconnectConfig, StreamEvent, StreamHandle, StreamOptions};
