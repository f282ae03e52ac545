// Lights HTTP client
//
// Wraps `reqwest::Client` with URL construction, status checking and body
// validation for the authority's `/api/lights` endpoints. Every method is
// one independent request/response exchange; none of them touch any
// local state.

use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::{ApiLight, CreateLightRequest, Ident, LightsResponse, StateRequest};
use crate::transport::TransportConfig;
use crate::websocket;

/// Longest slice of an error body carried into [`Error::Http`].
const ERROR_BODY_PREVIEW: usize = 200;

/// Raw HTTP client for the authority's lights API.
pub struct LightsClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl LightsClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the authority root, e.g. `http://192.168.1.20:8080`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout_secs: transport.timeout_secs(),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout_secs: 0,
        }
    }

    /// WebSocket URL of the update stream on the same authority.
    pub fn stream_url(&self) -> Result<Url, Error> {
        websocket::stream_url(&self.base_url)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /api/lights` -- full state of every light.
    pub async fn list_lights(&self) -> Result<LightsResponse, Error> {
        let url = self.lights_url(&[])?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_err(e))?;
        let body = self.checked_body(resp).await?;
        parse_body(&body)
    }

    /// `POST /api/lights/{group}/{light}` with a partial state body.
    pub async fn set_state(
        &self,
        group_id: &Ident,
        light_id: &Ident,
        state: &StateRequest,
    ) -> Result<(), Error> {
        let url = self.light_url(group_id, light_id)?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(state)
            .send()
            .await
            .map_err(|e| self.transport_err(e))?;
        self.checked_body(resp).await?;
        Ok(())
    }

    /// Request a power change. The outcome arrives on the update stream.
    pub async fn set_power(&self, group_id: &Ident, light_id: &Ident, on: bool) -> Result<(), Error> {
        self.set_state(group_id, light_id, &StateRequest::power(on))
            .await
    }

    /// Request a brightness change. The outcome arrives on the update stream.
    pub async fn set_brightness(
        &self,
        group_id: &Ident,
        light_id: &Ident,
        value: i32,
    ) -> Result<(), Error> {
        self.set_state(group_id, light_id, &StateRequest::brightness(value))
            .await
    }

    /// `POST /api/lights` -- create a light with authority-assigned defaults.
    ///
    /// Returns the created entity when the authority echoes it back, `None`
    /// when it answers with a bare status.
    pub async fn create_light(&self, name: &str) -> Result<Option<ApiLight>, Error> {
        let url = self.lights_url(&[])?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(&CreateLightRequest { name: name.to_owned() })
            .send()
            .await
            .map_err(|e| self.transport_err(e))?;
        let body = self.checked_body(resp).await?;

        if body.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<ApiLight>(&body) {
            Ok(light) => Ok(Some(light)),
            Err(e) => {
                trace!(error = %e, "create response is not a light entity");
                Ok(None)
            }
        }
    }

    /// `DELETE /api/lights/{group}/{light}`.
    pub async fn delete_light(&self, group_id: &Ident, light_id: &Ident) -> Result<(), Error> {
        let url = self.light_url(group_id, light_id)?;
        debug!("DELETE {}", url);

        let resp = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| self.transport_err(e))?;
        self.checked_body(resp).await?;
        Ok(())
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/api/lights/{extra...}` with each segment percent-encoded.
    fn lights_url(&self, extra: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(["api", "lights"])
            .extend(extra);
        Ok(url)
    }

    fn light_url(&self, group_id: &Ident, light_id: &Ident) -> Result<Url, Error> {
        let group = group_id.to_string();
        let light = light_id.to_string();
        self.lights_url(&[group.as_str(), light.as_str()])
    }

    // ── Response helpers ─────────────────────────────────────────────

    fn transport_err(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }

    /// Read the body of a successful response, or turn a non-2xx status
    /// into [`Error::Http`].
    async fn checked_body(&self, resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let preview: String = body.trim().chars().take(ERROR_BODY_PREVIEW).collect();
            let message = if preview.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("no response body")
                    .to_owned()
            } else {
                preview
            };
            return Err(Error::Http {
                status: status.as_u16(),
                message,
            });
        }

        resp.text().await.map_err(|e| self.transport_err(e))
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    })
}
