// ── Light storage ──
//
// The registry is the single owner of light state. Everything else
// reads immutable snapshots or subscribes to changes.

mod registry;

pub use registry::{LightRegistry, UpdateOutcome};
