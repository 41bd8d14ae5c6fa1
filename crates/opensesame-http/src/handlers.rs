// ── Request handlers ──

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use opensesame_api::StateStore;
use opensesame_core::{Gateway, PointSnapshot, ReadScope, WebId};

use crate::error::HttpError;

/// Query of `GET /get`. The bare `?all` flag selects the full catalog.
#[derive(Debug, Default, Deserialize)]
pub struct ReadParams {
    pub all: Option<String>,
}

impl ReadParams {
    fn scope(&self) -> ReadScope {
        if self.all.is_some() {
            ReadScope::All
        } else {
            ReadScope::Watched
        }
    }
}

/// Query of `GET /open`.
#[derive(Debug, Default, Deserialize)]
pub struct OpenParams {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub points: usize,
}

/// GET /get
pub async fn read<S: StateStore>(
    State(gateway): State<Gateway<S>>,
    Query(params): Query<ReadParams>,
) -> Result<Json<Vec<PointSnapshot>>, HttpError> {
    let scope = params.scope();
    let snapshots = gateway.read(scope).await?;
    debug!(%scope, count = snapshots.len(), "read");
    Ok(Json(snapshots))
}

/// GET /open?id=<webId>
pub async fn open<S: StateStore>(
    State(gateway): State<Gateway<S>>,
    Query(params): Query<OpenParams>,
) -> Result<Json<Vec<PointSnapshot>>, HttpError> {
    let web_id = params
        .id
        .filter(|id| !id.is_empty())
        .map(WebId::from)
        .ok_or(HttpError::MissingParameter("id"))?;

    let snapshots = gateway.command(&web_id).await?;
    info!(web_id = %web_id, "opened");
    Ok(Json(snapshots))
}

/// GET /health
pub async fn health<S: StateStore>(State(gateway): State<Gateway<S>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        points: gateway.registry().watched_len(),
    })
}
