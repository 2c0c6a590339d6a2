// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Request handlers for the HTTP API.
//!
//! Handlers are thin: they decode the request, call the [`ConfigManager`] and
//! encode the result. Every failure is an [`ApiError`].
//!
//! [`ConfigManager`]: crate::manager::ConfigManager

use super::AppState;
use crate::backup::BackupRecord;
use crate::diff::{self, DiffResult};
use crate::errors::ConfigError;
use crate::http_errors::ApiError;
use crate::manager::{ZoneInfo, ZoneSpec};
use crate::metrics::gather_metrics;
use crate::named_conf::{generator, ConfigElement};
use crate::validator::ValidationResult;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

type ApiResult<T> = Result<T, ApiError>;

/// Request body carrying configuration text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRequest {
    /// Full configuration text
    pub content: String,
}

/// Current configuration text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentResponse {
    /// Path of the tracked file
    pub path: PathBuf,
    /// Full configuration text
    pub content: String,
}

/// Request body for a diff. Without `old` the current file is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffRequest {
    /// Original text
    #[serde(default)]
    pub old: Option<String>,
    /// Proposed text
    pub new: String,
}

/// Request body for rendering a tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Tree to render; absent or `null` is a `NilRoot` error
    #[serde(default)]
    pub tree: Option<ConfigElement>,
}

/// Rendered configuration text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderResponse {
    /// Canonical text of the tree
    pub content: String,
}

/// Outcome of a mutation of the tracked file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResponse {
    /// Snapshot of the content that was replaced, if there was any
    pub backup: Option<BackupRecord>,
}

/// Outcome of a daemon command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse {
    /// Command that was run
    pub command: String,
    /// Daemon output, when the command produces any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /metrics`
pub async fn metrics() -> ApiResult<impl IntoResponse> {
    let text = gather_metrics().map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    ))
}

/// `GET /api/v1/config`
pub async fn get_config(State(state): State<AppState>) -> ApiResult<Json<ContentResponse>> {
    let content = state.manager.read_content().await?;
    Ok(Json(ContentResponse {
        path: state.manager.config_path().to_path_buf(),
        content,
    }))
}

/// `PUT /api/v1/config`
pub async fn put_config(
    State(state): State<AppState>,
    payload: Result<Json<ContentRequest>, JsonRejection>,
) -> ApiResult<Json<CommitResponse>> {
    let request = body(payload)?;
    let backup = state.manager.update_content(&request.content).await?;
    Ok(Json(CommitResponse { backup }))
}

/// `POST /api/v1/config/validate`
pub async fn validate_config(
    State(state): State<AppState>,
    payload: Result<Json<ContentRequest>, JsonRejection>,
) -> ApiResult<Json<ValidationResult>> {
    let request = body(payload)?;
    Ok(Json(state.manager.validate(&request.content).await?))
}

/// `POST /api/v1/config/diff`
pub async fn diff_config(
    State(state): State<AppState>,
    payload: Result<Json<DiffRequest>, JsonRejection>,
) -> ApiResult<Json<DiffResult>> {
    let request = body(payload)?;
    let result = match request.old {
        Some(old) => diff::diff(&old, &request.new),
        None => state.manager.propose(&request.new).await?,
    };
    Ok(Json(result))
}

/// `GET /api/v1/config/tree`
pub async fn config_tree(State(state): State<AppState>) -> ApiResult<Json<ConfigElement>> {
    Ok(Json(state.manager.parse()?))
}

/// `POST /api/v1/config/render`
pub async fn render_config(
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> ApiResult<Json<RenderResponse>> {
    let request = body(payload)?;
    let content = generator::render(request.tree.as_ref()).map_err(ConfigError::from)?;
    Ok(Json(RenderResponse { content }))
}

/// `GET /api/v1/backups`
pub async fn list_backups(State(state): State<AppState>) -> ApiResult<Json<Vec<BackupRecord>>> {
    Ok(Json(state.manager.list_backups()?))
}

/// `POST /api/v1/backups`
pub async fn create_backup(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<BackupRecord>)> {
    let record = state.manager.create_backup().await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `POST /api/v1/backups/{id}/restore`
pub async fn restore_backup(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CommitResponse>> {
    let backup = state.manager.restore_backup(&id).await?;
    Ok(Json(CommitResponse { backup }))
}

/// `DELETE /api/v1/backups/{id}`
pub async fn delete_backup(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.manager.delete_backup(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/zones`
pub async fn list_zones(State(state): State<AppState>) -> ApiResult<Json<Vec<ZoneInfo>>> {
    Ok(Json(state.manager.list_zones()?))
}

/// `POST /api/v1/zones`
pub async fn add_zone(
    State(state): State<AppState>,
    payload: Result<Json<ZoneSpec>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CommitResponse>)> {
    let spec = body(payload)?;
    let backup = state.manager.add_zone(&spec).await?;
    Ok((StatusCode::CREATED, Json(CommitResponse { backup })))
}

/// `DELETE /api/v1/zones/{name}`
pub async fn remove_zone(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<CommitResponse>> {
    let backup = state.manager.remove_zone(&name).await?;
    Ok(Json(CommitResponse { backup }))
}

/// `GET /api/v1/server/status`
pub async fn server_status(State(state): State<AppState>) -> ApiResult<Json<DaemonResponse>> {
    let output = state.manager.status().await?;
    Ok(Json(DaemonResponse {
        command: "status".to_string(),
        output: Some(output),
    }))
}

/// `POST /api/v1/server/start`
pub async fn server_start(State(state): State<AppState>) -> ApiResult<Json<DaemonResponse>> {
    state.manager.start().await?;
    Ok(Json(done("start")))
}

/// `POST /api/v1/server/stop`
pub async fn server_stop(State(state): State<AppState>) -> ApiResult<Json<DaemonResponse>> {
    state.manager.stop().await?;
    Ok(Json(done("stop")))
}

/// `POST /api/v1/server/reload`
pub async fn server_reload(State(state): State<AppState>) -> ApiResult<Json<DaemonResponse>> {
    state.manager.reload().await?;
    Ok(Json(done("reload")))
}

fn done(command: &str) -> DaemonResponse {
    DaemonResponse {
        command: command.to_string(),
        output: None,
    }
}
