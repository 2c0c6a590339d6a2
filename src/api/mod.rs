// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP API for the configuration manager.
//!
//! Routes under `/api/v1` expose the safe-edit transaction, snapshot management,
//! zone declarations and daemon control. `/health` and `/metrics` are always
//! unauthenticated; `/api/v1/*` requires `Authorization: Bearer <token>` when a
//! token is configured.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET | `/api/v1/config` | current content |
//! | PUT | `/api/v1/config` | commit new content |
//! | POST | `/api/v1/config/validate` | run the checker |
//! | POST | `/api/v1/config/diff` | line diff |
//! | GET | `/api/v1/config/tree` | parsed tree |
//! | POST | `/api/v1/config/render` | render a tree to text |
//! | GET / POST | `/api/v1/backups` | list / take a snapshot |
//! | POST | `/api/v1/backups/{id}/restore` | restore a snapshot |
//! | DELETE | `/api/v1/backups/{id}` | delete a snapshot |
//! | GET / POST | `/api/v1/zones` | list / declare zones |
//! | DELETE | `/api/v1/zones/{name}` | remove a zone |
//! | GET | `/api/v1/server/status` | daemon status |
//! | POST | `/api/v1/server/start`, `stop`, `reload` | daemon control |
//!
//! # Example
//!
//! ```rust,no_run
//! use bindconf::api::{router, AppState};
//! use bindconf::manager::ConfigManager;
//! # use bindconf::{backup::BackupStore, daemon::RndcController, validator::Validator};
//! # use std::{sync::Arc, time::Duration};
//!
//! # async fn example() -> anyhow::Result<()> {
//! # let manager = ConfigManager::new(
//! #     "/etc/bind/named.conf",
//! #     Validator::new("named-checkconf", Duration::from_secs(5)),
//! #     BackupStore::new("./backup", 10),
//! #     Arc::new(RndcController::new("rndc", "named", "/etc/bind/named.conf", Duration::from_secs(30))),
//! # );
//! let state = AppState::new(Arc::new(manager), Some("secret".to_string()));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, router(state)).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod handlers;

use crate::constants::API_PREFIX;
use crate::manager::ConfigManager;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Manager of the tracked configuration
    pub manager: Arc<ConfigManager>,
    /// Bearer token required on `/api/v1`; `None` disables authentication
    pub api_token: Option<Arc<str>>,
}

impl AppState {
    /// Build state around `manager`. An empty token disables authentication.
    #[must_use]
    pub fn new(manager: Arc<ConfigManager>, api_token: Option<String>) -> Self {
        Self {
            manager,
            api_token: api_token.filter(|t| !t.is_empty()).map(Arc::from),
        }
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/config",
            get(handlers::get_config).put(handlers::put_config),
        )
        .route("/config/validate", post(handlers::validate_config))
        .route("/config/diff", post(handlers::diff_config))
        .route("/config/tree", get(handlers::config_tree))
        .route("/config/render", post(handlers::render_config))
        .route(
            "/backups",
            get(handlers::list_backups).post(handlers::create_backup),
        )
        .route("/backups/{id}", delete(handlers::delete_backup))
        .route("/backups/{id}/restore", post(handlers::restore_backup))
        .route("/zones", get(handlers::list_zones).post(handlers::add_zone))
        .route("/zones/{name}", delete(handlers::remove_zone))
        .route("/server/status", get(handlers::server_status))
        .route("/server/start", post(handlers::server_start))
        .route("/server/stop", post(handlers::server_stop))
        .route("/server/reload", post(handlers::server_reload))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .nest(API_PREFIX, api)
        .with_state(state)
}
