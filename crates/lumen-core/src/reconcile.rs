// ── Reconciliation ──
//
// Routes every inbound change, whether a full query response or a pushed
// update, into the registry. Holds no state of its own: precedence
// falls out of arrival order. A full replace discards everything applied
// before it; events apply in order, last write wins per field.

use lumen_api::{LightsResponse, StateUpdateEvent};

use crate::model::Light;
use crate::store::{LightRegistry, UpdateOutcome};

/// An inbound change from either channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A successful `GET /api/lights` response.
    Full(LightsResponse),
    /// One validated stream event.
    Update(StateUpdateEvent),
}

/// What applying an [`Inbound`] did to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Replaced { lights: usize },
    Updated(UpdateOutcome),
}

/// Stateless router from inbound changes to registry mutations.
pub struct Reconciler;

impl Reconciler {
    pub fn apply(registry: &LightRegistry, inbound: Inbound) -> ReconcileOutcome {
        match inbound {
            Inbound::Full(response) => {
                let lights: Vec<Light> = response.lights.into_iter().map(Light::from).collect();
                let count = registry.replace_full(lights, response.groups);
                tracing::debug!(lights = count, "registry replaced from full query");
                ReconcileOutcome::Replaced { lights: count }
            }
            Inbound::Update(event) => {
                let outcome = registry.apply_update(&event);
                match &outcome {
                    UpdateOutcome::Applied { key, changed } => {
                        tracing::trace!(%key, changed, "update applied");
                    }
                    UpdateOutcome::UnknownTarget { key } => {
                        tracing::debug!(
                            %key,
                            unknown_total = registry.unknown_target_count(),
                            "update for unknown light ignored"
                        );
                    }
                }
                ReconcileOutcome::Updated(outcome)
            }
        }
    }
}
