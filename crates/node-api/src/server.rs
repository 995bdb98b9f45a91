//! Router assembly and serving

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use rnmos_connection_core::ConnectionEngine;
use rnmos_node_core::SharedModel;

use crate::{connection_api, node_api};

/// Shared state behind every handler.
#[derive(Clone)]
pub struct ApiState {
    pub model: SharedModel,
    pub engine: Arc<ConnectionEngine>,
}

/// `TRACE` is not permitted anywhere on the surface.
async fn reject_trace(request: Request<Body>, next: Next) -> Response {
    if request.method() == Method::TRACE {
        return Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .body(Body::empty())
            .unwrap_or_default();
    }
    next.run(request).await
}

/// The complete HTTP surface.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(|| async { Json(json!(["x-nmos/"])) }))
        .route("/x-nmos/", get(|| async { Json(json!(["node/", "connection/"])) }))
        .nest("/x-nmos/node", node_api::router())
        .nest("/x-nmos/connection", connection_api::router())
        .layer(middleware::from_fn(reject_trace))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the shutdown future resolves.
pub async fn serve(
    state: ApiState,
    addr: SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(state, listener, shutdown).await
}

/// Serve on an already bound listener until the shutdown future resolves.
pub async fn serve_on(
    state: ApiState,
    listener: TcpListener,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "node API listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
