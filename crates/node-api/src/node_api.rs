//! IS-04 Node API v1.3 (read-only)

use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use uuid::Uuid;

use rnmos_node_core::{make_id, ResourceKind};

use crate::error::ApiError;
use crate::server::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/", get(|| async { Json(json!(["v1.3/"])) }))
        .route(
            "/v1.3/",
            get(|| async {
                Json(json!([
                    "self/",
                    "devices/",
                    "sources/",
                    "flows/",
                    "senders/",
                    "receivers/",
                ]))
            }),
        )
        .route("/v1.3/self/", get(get_self))
        .route("/v1.3/devices/", get(list_devices))
        .route("/v1.3/devices/:id/", get(get_device))
        .route("/v1.3/sources/", get(list_sources))
        .route("/v1.3/sources/:id/", get(get_source))
        .route("/v1.3/flows/", get(list_flows))
        .route("/v1.3/flows/:id/", get(get_flow))
        .route("/v1.3/senders/", get(list_senders))
        .route("/v1.3/senders/:id/", get(get_sender))
        .route("/v1.3/receivers/", get(list_receivers))
        .route("/v1.3/receivers/:id/", get(get_receiver))
}

async fn get_self(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    let model = state.model.read().await;
    let node_id = make_id(&model.settings.seed_id, ResourceKind::Node, "");
    let node = model
        .node_resources
        .find(&node_id, ResourceKind::Node)
        .ok_or(ApiError::NotFound)?;
    Ok(Json(node.data.clone()))
}

async fn list_kind(state: &ApiState, kind: ResourceKind) -> Json<Value> {
    let model = state.model.read().await;
    let resources: Vec<Value> = model
        .node_resources
        .iter_kind(kind)
        .map(|resource| resource.data.clone())
        .collect();
    Json(Value::Array(resources))
}

async fn get_kind(state: &ApiState, kind: ResourceKind, id: Uuid) -> Result<Json<Value>, ApiError> {
    let model = state.model.read().await;
    let resource = model
        .node_resources
        .find(&id, kind)
        .ok_or(ApiError::NotFound)?;
    Ok(Json(resource.data.clone()))
}

async fn list_devices(State(state): State<ApiState>) -> Json<Value> {
    list_kind(&state, ResourceKind::Device).await
}

async fn get_device(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    get_kind(&state, ResourceKind::Device, id).await
}

async fn list_sources(State(state): State<ApiState>) -> Json<Value> {
    list_kind(&state, ResourceKind::Source).await
}

async fn get_source(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    get_kind(&state, ResourceKind::Source, id).await
}

async fn list_flows(State(state): State<ApiState>) -> Json<Value> {
    list_kind(&state, ResourceKind::Flow).await
}

async fn get_flow(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    get_kind(&state, ResourceKind::Flow, id).await
}

async fn list_senders(State(state): State<ApiState>) -> Json<Value> {
    list_kind(&state, ResourceKind::Sender).await
}

async fn get_sender(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    get_kind(&state, ResourceKind::Sender, id).await
}

async fn list_receivers(State(state): State<ApiState>) -> Json<Value> {
    list_kind(&state, ResourceKind::Receiver).await
}

async fn get_receiver(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    get_kind(&state, ResourceKind::Receiver, id).await
}
