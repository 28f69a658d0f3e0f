//! HTTP front-end.
//!
//! | Route         | Response                                              |
//! |---------------|-------------------------------------------------------|
//! | `GET /health` | `{"status": "ok", "tools": <count>}`                  |
//! | `GET /tools`  | `{"tools": [<descriptor>, ...]}` in registration order |
//! | `POST /tool`  | `InvocationRequest` in, `ResponseEnvelope` out         |
//!
//! Every dispatched call answers `200 OK`; success or failure is carried by
//! the envelope. A body that is not a valid request gets `400` with a failure
//! envelope, and a server that is shutting down answers `503`.

use std::future::Future;
use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tool_kernel::{InvocationRequest, ResponseEnvelope, ToolServer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{Result, TransportError};

/// Builds the router over a server.
pub fn router(server: ToolServer) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/tool", post(invoke_tool))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

/// Binds `addr` and serves until `shutdown` resolves.
///
/// The scheduler is closed once the listener stops, so calls still queued for
/// a permit fail instead of running after shutdown.
///
/// # Errors
///
/// Returns [`TransportError::Bind`] when the address cannot be bound and
/// [`TransportError::Io`] when the accept loop fails.
pub async fn serve_http<F>(server: ToolServer, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| TransportError::Bind { addr, source })?;
    let local = listener.local_addr()?;
    info!(%local, tools = server.descriptors().len(), "http transport listening");

    let app = router(server.clone());
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;
    server.shutdown();
    info!("http transport stopped");
    served.map_err(TransportError::from)
}

/// Resolves when the process receives Ctrl-C.
pub async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c; shutting down");
    }
}

async fn health(State(server): State<ToolServer>) -> Json<Value> {
    Json(json!({ "status": "ok", "tools": server.descriptors().len() }))
}

async fn list_tools(State(server): State<ToolServer>) -> Json<Value> {
    Json(json!({ "tools": server.descriptors() }))
}

async fn invoke_tool(
    State(server): State<ToolServer>,
    payload: std::result::Result<Json<InvocationRequest>, JsonRejection>,
) -> (StatusCode, Json<ResponseEnvelope>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected invocation body");
            let envelope =
                ResponseEnvelope::failure(format!("invalid request: {}", rejection.body_text()));
            return (StatusCode::BAD_REQUEST, Json(envelope));
        }
    };

    let handle = match server.schedule(request) {
        Ok(handle) => handle,
        Err(err) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ResponseEnvelope::failure(format!("server unavailable: {err}"))),
            );
        }
    };

    match handle.await {
        Ok(Ok(envelope)) => (StatusCode::OK, Json(envelope)),
        Ok(Err(err)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ResponseEnvelope::failure(format!("server unavailable: {err}"))),
        ),
        Err(err) => {
            error!(error = %err, "invocation task aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ResponseEnvelope::failure("invocation task aborted")),
            )
        }
    }
}
