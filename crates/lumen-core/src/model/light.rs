// ── Light and its composite identity ──

use std::fmt;

use lumen_api::{ApiLight, Ident};
use serde::{Deserialize, Serialize};

// ── LightKey ────────────────────────────────────────────────────────

/// Composite identity of a light: `(group_id, light_id)`.
///
/// Unique within the registry. Identifier equality is strict, so a
/// numeric `1` and a text `"1"` name different lights.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LightKey {
    pub group_id: Ident,
    pub light_id: Ident,
}

impl LightKey {
    pub fn new(group_id: impl Into<Ident>, light_id: impl Into<Ident>) -> Self {
        Self {
            group_id: group_id.into(),
            light_id: light_id.into(),
        }
    }

    /// Build a key from user-typed text. Values that parse as integers
    /// become [`Ident::Numeric`], everything else [`Ident::Text`].
    pub fn from_args(group: &str, light: &str) -> Self {
        Self {
            group_id: ident_from_arg(group),
            light_id: ident_from_arg(light),
        }
    }

    /// `true` when both parts render to the given strings.
    ///
    /// Used to resolve user input against the registry without caring
    /// whether the authority issued numeric or text identifiers.
    pub fn matches_display(&self, group: &str, light: &str) -> bool {
        self.group_id.to_string() == group && self.light_id.to_string() == light
    }
}

impl fmt::Display for LightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group_id, self.light_id)
    }
}

fn ident_from_arg(raw: &str) -> Ident {
    raw.parse::<i64>()
        .map_or_else(|_| Ident::Text(raw.to_owned()), Ident::Numeric)
}

// ── Light ───────────────────────────────────────────────────────────

/// A controllable light as held in the registry.
///
/// Brightness is the authority's integer value; no range is imposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Light {
    pub group_id: Ident,
    pub light_id: Ident,
    pub name: String,
    pub on: bool,
    pub brightness: i32,
}

impl Light {
    pub fn key(&self) -> LightKey {
        LightKey {
            group_id: self.group_id.clone(),
            light_id: self.light_id.clone(),
        }
    }
}

impl From<ApiLight> for Light {
    fn from(l: ApiLight) -> Self {
        Self {
            group_id: l.group_id,
            light_id: l.light_id,
            name: l.name,
            on: l.on,
            brightness: l.brightness,
        }
    }
}
