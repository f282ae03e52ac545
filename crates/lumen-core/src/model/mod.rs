// ── Domain model ──
//
// Canonical light types that consumers (CLI, watchers) depend on.
// Wire types from `lumen-api` are converted here at the boundary.

pub mod light;

pub use light::{Light, LightKey};
pub use lumen_api::Ident;
