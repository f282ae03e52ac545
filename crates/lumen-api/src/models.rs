// Wire types for the authority's HTTP API and update stream
//
// Request bodies serialize exactly what the authority expects; response
// and stream types validate at the deserialization boundary, so a body
// with a missing or mistyped field is rejected instead of half-applied.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Identifiers ──────────────────────────────────────────────────────

/// Opaque authority-scoped identifier.
///
/// The authority may use JSON integers or strings. The two forms never
/// compare equal: `1` and `"1"` are different identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ident {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Ident {
    fn from(n: i64) -> Self {
        Self::Numeric(n)
    }
}

impl From<i32> for Ident {
    fn from(n: i32) -> Self {
        Self::Numeric(i64::from(n))
    }
}

impl From<String> for Ident {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

// ── Lights ───────────────────────────────────────────────────────────

/// A light as reported by `GET /api/lights`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiLight {
    pub group_id: Ident,
    pub light_id: Ident,
    pub name: String,
    pub on: bool,
    pub brightness: i32,
}

/// Full query response: `{ "lights": [...], "groups": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightsResponse {
    pub lights: Vec<ApiLight>,
    /// Group identifiers known to the authority, including empty groups.
    #[serde(default)]
    pub groups: Vec<Ident>,
}

// ── State changes ────────────────────────────────────────────────────

/// Partial state change. `None` fields are left untouched.
///
/// Used both as the body of `POST /api/lights/{group}/{light}` and inside
/// stream events. Absent fields are omitted on the way out and accepted
/// as either `null` or missing on the way in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bri: Option<i32>,
}

impl StateRequest {
    pub fn power(on: bool) -> Self {
        Self {
            on: Some(on),
            bri: None,
        }
    }

    pub fn brightness(bri: i32) -> Self {
        Self {
            on: None,
            bri: Some(bri),
        }
    }

    /// `true` when neither field is present.
    pub fn is_empty(&self) -> bool {
        self.on.is_none() && self.bri.is_none()
    }
}

/// Pushed notification that one light changed state.
///
/// Wire form: `{"groupID": .., "lightID": .., "stateRequest": {"on": .., "bri": ..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdateEvent {
    #[serde(rename = "groupID")]
    pub group_id: Ident,
    #[serde(rename = "lightID")]
    pub light_id: Ident,
    #[serde(rename = "stateRequest")]
    pub state_request: StateRequest,
}

/// Body of `POST /api/lights`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateLightRequest {
    pub name: String,
}
