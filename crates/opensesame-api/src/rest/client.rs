// simple-api HTTP client
//
// Wraps `reqwest::Client` with URL construction, optional credential
// injection and status mapping. Every endpoint returns bare JSON.

use std::collections::HashMap;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::poll::{PollConfig, poll_notifications};
use crate::error::Error;
use crate::store::{NotificationStream, StateStore};
use crate::transport::TransportConfig;
use crate::types::{ObjectMeta, PointState, PointValue, ScanResult};

/// HTTP client for an ioBroker `simple-api` endpoint.
///
/// Cheap to clone: the underlying `reqwest::Client` is reference counted.
/// Calling [`shutdown`](Self::shutdown) ends every subscription stream
/// vended by this client or any of its clones.
#[derive(Clone)]
pub struct RestStore {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<(String, SecretString)>,
    /// Request timeout the client was built with, reported on timeouts.
    timeout: Duration,
    poll: PollConfig,
    cancel: CancellationToken,
}

/// `GET /get/{id}` body: the state merged with its object.
#[derive(Debug, Deserialize)]
struct RawState {
    #[serde(default)]
    val: serde_json::Value,
    #[serde(default)]
    ack: bool,
    #[serde(default)]
    ts: Option<i64>,
    #[serde(default)]
    common: ObjectMeta,
}

/// One entry of the `GET /objects` map.
#[derive(Debug, Deserialize)]
struct RawObject {
    #[serde(default)]
    common: ObjectMeta,
}

impl RestStore {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the root of the simple-api adapter, e.g.
    /// `http://iobroker.local:8087`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url).with_timeout(transport.timeout))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    ///
    /// Assumes the default transport timeout; use
    /// [`with_timeout`](Self::with_timeout) if the client was built otherwise.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            credentials: None,
            timeout: TransportConfig::default().timeout,
            poll: PollConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Authenticate every request with `user`/`pass` query parameters.
    pub fn with_credentials(mut self, username: String, password: SecretString) -> Self {
        self.credentials = Some((username, password));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stop all polling subscriptions.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{segments...}`, percent-encoding each segment and
    /// appending credentials when configured.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);

        if let Some((user, pass)) = &self.credentials {
            url.query_pairs_mut()
                .append_pair("user", user)
                .append_pair("pass", pass.expose_secret());
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET and decode the JSON body. `id` names the object for
    /// not-found errors.
    async fn get_json<T: DeserializeOwned>(&self, url: Url, id: &str) -> Result<T, Error> {
        debug!(path = url.path(), "GET");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.map_transport(e))?;

        match status {
            s if s.is_success() => {}
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                return Err(Error::Authentication { message: body });
            }
            reqwest::StatusCode::NOT_FOUND => {
                return Err(Error::NotFound { id: id.to_owned() });
            }
            s => {
                return Err(Error::Store {
                    status: s.as_u16(),
                    message: body,
                });
            }
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    /// Surface client-side timeouts as their own variant.
    fn map_transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }
}

impl StateStore for RestStore {
    /// `GET /objects?pattern=*&type={type_filter}`
    async fn scan_objects(&self, type_filter: &str) -> Result<ScanResult, Error> {
        let mut url = self.endpoint(&["objects"])?;
        url.query_pairs_mut()
            .append_pair("pattern", "*")
            .append_pair("type", type_filter);

        let objects: HashMap<String, Option<RawObject>> = self.get_json(url, "*").await?;
        debug!(count = objects.len(), "scanned store objects");

        Ok(objects
            .into_iter()
            .filter_map(|(id, obj)| obj.map(|o| (id, o.common)))
            .collect())
    }

    /// `GET /get/{id}`
    async fn get_point(&self, id: &str) -> Result<PointState, Error> {
        let url = self.endpoint(&["get", id])?;
        let raw: RawState = self.get_json(url, id).await?;

        Ok(PointState {
            value: PointValue::from_json(raw.val),
            ack: raw.ack,
            ts: raw.ts,
            meta: raw.common,
        })
    }

    /// `GET /set/{id}?value={value}`
    async fn set_point(&self, id: &str, value: PointValue) -> Result<(), Error> {
        let mut url = self.endpoint(&["set", id])?;
        url.query_pairs_mut()
            .append_pair("value", &value.to_string());

        match self.get_json::<serde_json::Value>(url, id).await {
            Ok(_) => {
                debug!(id, %value, "write accepted");
                Ok(())
            }
            Err(Error::Store { message, .. }) => Err(Error::Rejected {
                id: id.to_owned(),
                message,
            }),
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self, id: &str) -> Result<NotificationStream, Error> {
        if self.cancel.is_cancelled() {
            return Err(Error::Closed);
        }
        Ok(poll_notifications(self.clone(), id.to_owned()))
    }
}
