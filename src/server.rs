//! HTTP routes. Handlers only translate between JSON and the services in
//! `AppState`; every failure leaves as `error::Error`.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::drive::{DriveClient, DriveFile};
use crate::error::{Error, Result};
use crate::telegram::feed::{ChannelFeed, FeedItem};
use crate::telegram::login::{LoginPayload, LoginVerifier, VerifiedIdentity};
use crate::updates::UpdateInfo;

pub const SERVICE_NAME: &str = "unistream-api";

/// Immutable per-process state shared by all requests
pub struct AppState {
    pub verifier: LoginVerifier,
    pub feed: ChannelFeed,
    pub drive: DriveClient,
    pub update_info: UpdateInfo,
    pub default_feed_limit: usize,
}

// ── Request / response types ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct VerifyLoginRequest {
    #[serde(default)]
    auth_data: Option<Value>,
}

#[derive(Deserialize)]
struct FeedQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Serialize)]
struct VerifyLoginResponse {
    ok: bool,
    user: VerifiedIdentity,
}

#[derive(Serialize)]
struct FeedResponse {
    ok: bool,
    items: Vec<FeedItem>,
}

#[derive(Serialize)]
struct DriveResponse {
    ok: bool,
    files: Vec<DriveFile>,
}

// ── Handlers ───────────────────────────────────────────────────────────────────

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: SERVICE_NAME,
    })
}

async fn verify_login(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<VerifyLoginRequest>, JsonRejection>,
) -> Result<Json<VerifyLoginResponse>> {
    let Json(body) = body.map_err(|e| Error::BadRequest(e.body_text()))?;

    let auth_data = match body.auth_data {
        None | Some(Value::Null) => {
            return Err(Error::BadRequest("auth_data missing".to_string()))
        }
        Some(Value::Object(map)) => map,
        Some(_) => return Err(Error::BadRequest("auth_data must be an object".to_string())),
    };

    let payload = LoginPayload::from_json(auth_data)?;
    let user = state.verifier.verify(&payload).inspect_err(log_failure)?;

    Ok(Json(VerifyLoginResponse { ok: true, user }))
}

async fn channel_latest(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    query: std::result::Result<Query<FeedQuery>, QueryRejection>,
) -> Result<Json<FeedResponse>> {
    let Query(query) = query.map_err(|e| Error::BadRequest(e.body_text()))?;
    let limit = query.limit.unwrap_or(state.default_feed_limit);

    let items = state
        .feed
        .fetch_latest(&name, limit)
        .await
        .inspect_err(log_failure)?;

    Ok(Json(FeedResponse { ok: true, items }))
}

async fn drive_files(
    State(state): State<Arc<AppState>>,
    Path(folder_id): Path<String>,
) -> Result<Json<DriveResponse>> {
    let files = state
        .drive
        .list_folder(&folder_id)
        .await
        .inspect_err(log_failure)?;

    Ok(Json(DriveResponse { ok: true, files }))
}

async fn update_latest(State(state): State<Arc<AppState>>) -> Json<UpdateInfo> {
    Json(state.update_info.clone())
}

/// Auth failures are already logged with their reason by the verifier.
fn log_failure(err: &Error) {
    if !matches!(err, Error::Auth(_)) {
        error!("Request failed: {}", err);
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/telegram/verify-login", post(verify_login))
        .route("/telegram/channel/{name}/latest", get(channel_latest))
        .route("/drive/folder/{folder_id}/files", get(drive_files))
        .route("/update/latest", get(update_latest))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
