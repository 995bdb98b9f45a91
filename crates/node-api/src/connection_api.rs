//! IS-05 Connection API v1.1

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use uuid::Uuid;

use rnmos_connection_core::PatchOutcome;
use rnmos_node_core::ResourceKind;

use crate::error::ApiError;
use crate::server::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/", get(|| async { Json(json!(["v1.1/"])) }))
        .route("/v1.1/", get(|| async { Json(json!(["bulk/", "single/"])) }))
        .route(
            "/v1.1/single/",
            get(|| async { Json(json!(["senders/", "receivers/"])) }),
        )
        .route("/v1.1/single/senders/", get(list_senders))
        .route(
            "/v1.1/single/senders/:id/",
            get(|| async {
                Json(json!(["constraints/", "staged/", "active/", "transportfile/"]))
            }),
        )
        .route("/v1.1/single/senders/:id/constraints/", get(sender_constraints))
        .route(
            "/v1.1/single/senders/:id/staged/",
            get(sender_staged).patch(patch_sender_staged),
        )
        .route("/v1.1/single/senders/:id/active/", get(sender_active))
        .route("/v1.1/single/senders/:id/transportfile/", get(sender_transportfile))
        .route("/v1.1/single/receivers/", get(list_receivers))
        .route(
            "/v1.1/single/receivers/:id/",
            get(|| async { Json(json!(["constraints/", "staged/", "active/"])) }),
        )
        .route(
            "/v1.1/single/receivers/:id/constraints/",
            get(receiver_constraints),
        )
        .route(
            "/v1.1/single/receivers/:id/staged/",
            get(receiver_staged).patch(patch_receiver_staged),
        )
        .route("/v1.1/single/receivers/:id/active/", get(receiver_active))
        .route("/v1.1/bulk/", get(|| async { Json(json!(["senders/", "receivers/"])) }))
        .route("/v1.1/bulk/senders/", post(bulk_senders))
        .route("/v1.1/bulk/receivers/", post(bulk_receivers))
}

async fn list_ids(state: &ApiState, kind: ResourceKind) -> Json<Value> {
    let model = state.model.read().await;
    let ids: Vec<Value> = model
        .connection_resources
        .iter_kind(kind)
        .map(|resource| json!(format!("{}/", resource.id)))
        .collect();
    Json(Value::Array(ids))
}

async fn endpoint(
    state: &ApiState,
    kind: ResourceKind,
    id: Uuid,
    field: &str,
) -> Result<Json<Value>, ApiError> {
    let model = state.model.read().await;
    let resource = model
        .connection_resources
        .find(&id, kind)
        .ok_or(ApiError::NotFound)?;
    Ok(Json(resource.data[field].clone()))
}

async fn list_senders(State(state): State<ApiState>) -> Json<Value> {
    list_ids(&state, ResourceKind::Sender).await
}

async fn list_receivers(State(state): State<ApiState>) -> Json<Value> {
    list_ids(&state, ResourceKind::Receiver).await
}

async fn sender_constraints(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    endpoint(&state, ResourceKind::Sender, id, "endpoint_constraints").await
}

async fn sender_staged(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    endpoint(&state, ResourceKind::Sender, id, "endpoint_staged").await
}

async fn sender_active(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    endpoint(&state, ResourceKind::Sender, id, "endpoint_active").await
}

/// The transport file is served as `application/sdp` data, or 404 until
/// the sender has been activated.
async fn sender_transportfile(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let model = state.model.read().await;
    let resource = model
        .connection_resources
        .find(&id, ResourceKind::Sender)
        .ok_or(ApiError::NotFound)?;
    let transportfile = &resource.data["endpoint_transportfile"];
    let data = transportfile["data"].as_str().ok_or(ApiError::NotFound)?;
    let content_type = transportfile["type"].as_str().unwrap_or("application/sdp");
    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, content_type.to_string())],
        data.to_string(),
    )
        .into_response())
}

async fn receiver_constraints(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    endpoint(&state, ResourceKind::Receiver, id, "endpoint_constraints").await
}

async fn receiver_staged(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    endpoint(&state, ResourceKind::Receiver, id, "endpoint_staged").await
}

async fn receiver_active(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    endpoint(&state, ResourceKind::Receiver, id, "endpoint_active").await
}

async fn patch_staged(
    state: &ApiState,
    kind: ResourceKind,
    id: Uuid,
    patch: Value,
) -> Result<Response, ApiError> {
    let outcome = state.engine.patch_staged(kind, id, patch).await?;
    Ok(match outcome {
        PatchOutcome::Applied(endpoint) => (StatusCode::OK, Json(endpoint)).into_response(),
        PatchOutcome::Scheduled(endpoint) => {
            (StatusCode::ACCEPTED, Json(endpoint)).into_response()
        }
    })
}

async fn patch_sender_staged(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<Value>,
) -> Result<Response, ApiError> {
    patch_staged(&state, ResourceKind::Sender, id, patch).await
}

async fn patch_receiver_staged(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<Value>,
) -> Result<Response, ApiError> {
    patch_staged(&state, ResourceKind::Receiver, id, patch).await
}

/// Apply a list of staged patches; the response reports the HTTP status
/// each would have received individually.
async fn bulk_staged(state: &ApiState, kind: ResourceKind, body: Value) -> Json<Value> {
    let requests = body.as_array().cloned().unwrap_or_default();
    let mut results = Vec::with_capacity(requests.len());
    for request in requests {
        let id = request["id"].as_str().and_then(|id| id.parse::<Uuid>().ok());
        let params = request["params"].clone();
        let (id_value, code) = match id {
            Some(id) => {
                let code = match state.engine.patch_staged(kind, id, params).await {
                    Ok(PatchOutcome::Applied(_)) => 200,
                    Ok(PatchOutcome::Scheduled(_)) => 202,
                    Err(rnmos_connection_core::Error::NotFound(_)) => 404,
                    Err(rnmos_connection_core::Error::Validation(_)) => 400,
                    Err(_) => 500,
                };
                (json!(id.to_string()), code)
            }
            None => (request["id"].clone(), 400),
        };
        results.push(json!({ "id": id_value, "code": code }));
    }
    Json(Value::Array(results))
}

async fn bulk_senders(State(state): State<ApiState>, Json(body): Json<Value>) -> Json<Value> {
    bulk_staged(&state, ResourceKind::Sender, body).await
}

async fn bulk_receivers(State(state): State<ApiState>, Json(body): Json<Value>) -> Json<Value> {
    bulk_staged(&state, ResourceKind::Receiver, body).await
}
