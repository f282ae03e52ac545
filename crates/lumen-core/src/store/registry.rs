// ── Ordered light registry ──
//
// Insertion-ordered storage keyed by `(group_id, light_id)` with
// push-based change notification via `watch` channels. Each mutation
// holds the write lock for its whole duration and publishes the new
// snapshot before releasing it, so subscribers see mutations in order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use lumen_api::{Ident, StateUpdateEvent};
use tokio::sync::watch;

use crate::model::{Light, LightKey};
use crate::stream::{LightSnapshot, LightStream};

/// Result of routing one update event into the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The target exists. `changed` is `false` when every present field
    /// already held the pushed value.
    Applied { key: LightKey, changed: bool },
    /// No light with this key; nothing was modified.
    UnknownTarget { key: LightKey },
}

#[derive(Default)]
struct RegistryState {
    lights: IndexMap<LightKey, Arc<Light>>,
    groups: Vec<Ident>,
    last_full_refresh: Option<DateTime<Utc>>,
    last_update: Option<DateTime<Utc>>,
}

/// The authoritative local view of every light.
///
/// Empty at startup, populated by a full replace, updated field-wise by
/// pushed events. Consumers get `Arc` snapshots and never hold the lock.
pub struct LightRegistry {
    state: RwLock<RegistryState>,

    /// Version counter, bumped on every published change.
    version: watch::Sender<u64>,

    /// Full snapshot, rebuilt on mutation for efficient subscription.
    snapshot: watch::Sender<LightSnapshot>,

    unknown_targets: AtomicU64,
}

impl Default for LightRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LightRegistry {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            state: RwLock::new(RegistryState::default()),
            version,
            snapshot,
            unknown_targets: AtomicU64::new(0),
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Replace the whole contents with `lights`, in the given order.
    ///
    /// Group identifiers are derived from the lights. Returns the number
    /// of lights now held.
    pub fn replace_all(&self, lights: Vec<Light>) -> usize {
        self.replace_full(lights, Vec::new())
    }

    /// Replace the contents with `lights` and the authority's group list.
    ///
    /// If the input repeats a key, the entry keeps the position of its
    /// first occurrence and the value of its last. Groups referenced by a
    /// light but missing from `groups` are appended in first-seen order.
    pub fn replace_full(&self, lights: Vec<Light>, groups: Vec<Ident>) -> usize {
        let mut map: IndexMap<LightKey, Arc<Light>> = IndexMap::with_capacity(lights.len());
        let mut duplicates = 0usize;
        for light in lights {
            if map.insert(light.key(), Arc::new(light)).is_some() {
                duplicates += 1;
            }
        }
        if duplicates > 0 {
            tracing::warn!(duplicates, "full replace contained repeated light keys");
        }

        let mut all_groups = groups;
        for light in map.values() {
            if !all_groups.contains(&light.group_id) {
                all_groups.push(light.group_id.clone());
            }
        }

        let mut state = self.write();
        state.lights = map;
        state.groups = all_groups;
        state.last_full_refresh = Some(Utc::now());
        self.publish(&state);
        state.lights.len()
    }

    /// Overwrite the fields present in `event` on the light it targets.
    ///
    /// Never inserts, never changes a key. An unknown target is counted
    /// and reported, with no other effect.
    pub fn apply_update(&self, event: &StateUpdateEvent) -> UpdateOutcome {
        let key = LightKey {
            group_id: event.group_id.clone(),
            light_id: event.light_id.clone(),
        };
        let request = &event.state_request;

        let mut state = self.write();
        let Some(slot) = state.lights.get_mut(&key) else {
            self.unknown_targets.fetch_add(1, Ordering::Relaxed);
            return UpdateOutcome::UnknownTarget { key };
        };

        let mut next = Light::clone(slot);
        if let Some(on) = request.on {
            next.on = on;
        }
        if let Some(bri) = request.bri {
            next.brightness = bri;
        }

        let changed = next != **slot;
        if changed {
            *slot = Arc::new(next);
        }
        state.last_update = Some(Utc::now());
        if changed {
            self.publish(&state);
        }

        UpdateOutcome::Applied { key, changed }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Current ordered snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> LightSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn get(&self, key: &LightKey) -> Option<Arc<Light>> {
        self.read().lights.get(key).map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.read().lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().lights.is_empty()
    }

    /// Group identifiers from the last full replace.
    pub fn groups(&self) -> Vec<Ident> {
        self.read().groups.clone()
    }

    /// Events dropped because their target was not in the registry.
    pub fn unknown_target_count(&self) -> u64 {
        self.unknown_targets.load(Ordering::Relaxed)
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> LightStream {
        LightStream::new(self.snapshot.subscribe())
    }

    /// Subscribe to the raw version counter.
    pub fn version(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        self.read().last_full_refresh
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.read().last_update
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rebuild the snapshot from `state` and broadcast it.
    fn publish(&self, state: &RegistryState) {
        let values: Vec<Arc<Light>> = state.lights.values().map(Arc::clone).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}
