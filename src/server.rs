//! HTTP surface over a [`Vault`].
//!
//! JSON in, JSON out, plus an SSE stream of [`VaultEvent`]s on `/events`.
//! Errors are `{"error": message, "code": code}` with a status derived from
//! the error code.

use crate::config::ServerConfig;
use crate::error::{Result, VaultError, error_codes};
use crate::events::VaultEvent;
use crate::vault::Vault;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use futures_util::StreamExt;
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

/// Shared state for every handler.
#[derive(Clone)]
struct AppState {
    vault: Arc<Vault>,
}

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Stable machine code (see [`error_codes`]).
    pub code: String,
}

/// A [`VaultError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(VaultError);

impl From<VaultError> for ApiError {
    fn from(e: VaultError) -> Self {
        Self(e)
    }
}

/// HTTP status for an error code.
pub fn status_for(err: &VaultError) -> StatusCode {
    match err.code() {
        error_codes::INVALID_REQUEST => StatusCode::BAD_REQUEST,
        error_codes::NOT_FOUND | error_codes::USER_NOT_FOUND => StatusCode::NOT_FOUND,
        error_codes::VALIDATION_FAILED => StatusCode::UNPROCESSABLE_ENTITY,
        error_codes::FETCH_FAILED => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let body = ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code().to_owned(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Build the router for `vault`.
pub fn router(vault: Arc<Vault>) -> Router {
    Router::new()
        .route("/latest-stats", get(handle_latest_stats))
        .route("/events", get(handle_events))
        .route("/backup", post(handle_create_backup))
        .route("/auto-backup", post(handle_start_schedule))
        .route("/stop-auto-backup", post(handle_stop_schedule))
        .route("/auto-backup-status", get(handle_schedule_status))
        .route("/backups", get(handle_list_backups))
        .route("/backup/{id}/stats", get(handle_backup_stats))
        .route("/backup/{id}/download", get(handle_download_backup))
        .route("/backup/{id}", axum::routing::delete(handle_delete_backup))
        .route("/logs", get(handle_logs))
        .route("/save-log", post(handle_save_log))
        .with_state(AppState { vault })
}

/// A running HTTP server.
pub struct VaultServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl VaultServer {
    /// Bind and serve in a background task.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Config`] if the address cannot be bound.
    pub async fn start(vault: Arc<Vault>, config: &ServerConfig) -> Result<Self> {
        let app = router(vault);

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| VaultError::Config(format!("server bind to {bind_addr} failed: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| VaultError::Config(format!("failed to get local addr: {e}")))?;

        info!("AniVault listening on http://{addr}");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting requests and drop open connections.
    pub fn stop(self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BackupRequest {
    #[serde(default)]
    username: Option<String>,
}

/// `keepLast` and `interval` may arrive as numbers or numeric strings.
#[derive(Debug, Deserialize)]
struct ScheduleRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(rename = "keepLast", default)]
    keep_last: Option<Value>,
    #[serde(default)]
    interval: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SaveLogRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "isSuccess", default)]
    is_success: bool,
}

fn json_body<T>(vault: &Vault, body: std::result::Result<Json<T>, JsonRejection>, context: &str) -> ApiResult<T> {
    body.map(|Json(inner)| inner).map_err(|rejection| {
        let err = VaultError::InvalidRequest(format!("malformed request body: {rejection}"));
        vault.journal().append(format!("{context}: {err}"), false);
        ApiError(err)
    })
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl ScheduleRequest {
    fn parse(&self) -> std::result::Result<(String, u32, f64), VaultError> {
        let username = self.username.as_deref().unwrap_or_default().trim();
        if username.is_empty() || self.keep_last.is_none() || self.interval.is_none() {
            return Err(VaultError::InvalidRequest(
                "All fields (username, keepLast, interval) are required".into(),
            ));
        }
        let (Some(keep_last), Some(interval)) = (
            number(self.keep_last.as_ref()),
            number(self.interval.as_ref()),
        ) else {
            return Err(VaultError::InvalidRequest(
                "Invalid number format for keepLast or interval".into(),
            ));
        };
        if keep_last.fract() != 0.0 || keep_last < 1.0 || keep_last > f64::from(u32::MAX) {
            return Err(VaultError::InvalidRequest(
                "keepLast must be a positive integer".into(),
            ));
        }
        Ok((username.to_owned(), keep_last as u32, interval))
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn handle_latest_stats(State(state): State<AppState>) -> Json<Value> {
    let value = state
        .vault
        .latest_stats()
        .and_then(|s| serde_json::to_value(s).ok())
        .unwrap_or_else(|| json!({}));
    Json(value)
}

fn sse_event(event: &VaultEvent) -> Event {
    match event {
        VaultEvent::KeepAlive => Event::default().event(event.kind()).data("{}"),
        _ => Event::default().data(event.to_json().to_string()),
    }
}

async fn handle_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let stream = state
        .vault
        .subscribe()
        .map(|event| Ok::<_, Infallible>(sse_event(&event)));
    Sse::new(stream)
}

async fn handle_create_backup(
    State(state): State<AppState>,
    body: std::result::Result<Json<BackupRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = json_body(&state.vault, body, "Manual backup")?;
    let username = request.username.unwrap_or_default();
    let meta = state.vault.create_backup(&username).await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!("Backup successfully created for {}.", meta.owner_id),
        "data": meta,
    })))
}

async fn handle_start_schedule(
    State(state): State<AppState>,
    body: std::result::Result<Json<ScheduleRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = json_body(&state.vault, body, "Auto-backup start")?;
    let (username, keep_last, interval) = request.parse().map_err(|e| {
        state
            .vault
            .journal()
            .append(format!("Auto-backup start: {e}"), false);
        ApiError(e)
    })?;
    let schedule = state
        .vault
        .start_schedule(&username, keep_last, interval)
        .await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!("Auto backup started for {}.", schedule.owner_id),
        "config": schedule,
    })))
}

async fn handle_stop_schedule(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let stopped = state.vault.stop_schedule().await?;
    let message = if stopped {
        "Auto backup stopped."
    } else {
        "Auto backup was not running."
    };
    Ok(Json(json!({ "status": "success", "message": message })))
}

async fn handle_schedule_status(State(state): State<AppState>) -> Json<Value> {
    let status = state.vault.schedule_status().await;
    Json(serde_json::to_value(status).unwrap_or_else(|_| json!({ "running": false })))
}

async fn handle_list_backups(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let backups = state.vault.list_backups(query.username.as_deref())?;
    Ok(Json(json!(backups)))
}

async fn handle_backup_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let stats = state.vault.backup_stats(&id)?;
    Ok(Json(json!(stats)))
}

async fn handle_download_backup(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let bytes = state.vault.download_backup(&id)?;
    let disposition = format!("attachment; filename=\"{id}.zip\"");
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

async fn handle_delete_backup(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.vault.delete_backup(&id).await?;
    Ok(Json(json!({ "status": "success" })))
}

async fn handle_logs(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.vault.logs()))
}

async fn handle_save_log(
    State(state): State<AppState>,
    body: std::result::Result<Json<SaveLogRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = json_body(&state.vault, body, "Save log")?;
    let Some(message) = request.message else {
        let err = VaultError::InvalidRequest("Message is required".into());
        state.vault.journal().append(format!("Save log: {err}"), false);
        return Err(ApiError(err));
    };
    state.vault.client_log(&message, request.is_success);
    Ok(Json(json!({ "status": "success" })))
}
