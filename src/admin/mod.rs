//! Admin status API.
//!
//! # Routes
//! - `GET /admin/status`: manager-wide [`StatusSummary`](crate::status::StatusSummary)
//! - `GET /admin/endpoints`: per-endpoint snapshots
//!
//! Every route requires `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::manager::RpcManager;

use self::auth::admin_auth_middleware;
use self::handlers::{get_endpoints, get_status};

/// Shared state of the admin router.
#[derive(Clone)]
pub struct AdminState {
    pub manager: Arc<RpcManager>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(manager: Arc<RpcManager>, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            manager,
            api_key: api_key.into(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/endpoints", get(get_endpoints))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin router until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: AdminState,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(address = %addr, "Admin API listening");
    }

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}
