//! Reactive light-state layer between `lumen-api` and consumers (CLI).
//!
//! This crate owns the domain model and the reconciliation logic that
//! keeps a local view of the authority's lights consistent:
//!
//! - **[`Controller`]**: Central facade managing the full lifecycle:
//!   [`connect()`](Controller::connect) runs the initial full query, then
//!   spawns background tasks for the update stream bridge, command
//!   processing and optional periodic resync.
//!   [`Controller::oneshot()`](Controller::oneshot) provides a lightweight
//!   mode for single CLI invocations.
//!
//! - **[`LightRegistry`]**: Ordered storage keyed by
//!   [`LightKey`] (`IndexMap` behind an `RwLock` + `tokio::sync::watch`
//!   snapshot channel).
//!
//! - **[`Reconciler`]**: Stateless routing of full query responses and
//!   pushed updates into the registry. A full replace wins over earlier
//!   updates; updates apply in arrival order, last write wins per field.
//!
//! - **[`LightStream`]**: Subscription handle vended by the registry.
//!   Exposes `current()` / `latest()` / `changed()` and a `Stream` adapter.
//!
//! - **[`Command`]**: Typed mutation requests routed through an `mpsc`
//!   channel to the controller's command processor.

pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::{ControllerConfig, TlsVerification};
pub use controller::{ConnectionState, Controller};
pub use error::CoreError;
pub use model::{Ident, Light, LightKey};
pub use reconcile::{Inbound, ReconcileOutcome, Reconciler};
pub use store::{LightRegistry, UpdateOutcome};
pub use stream::{LightSnapshot, LightStream};

pub use lumen_api::{ReconnectConfig, StreamEvent};
