use axum::{
    extract::{Query, State},
    http::{StatusCode, Uri},
    response::Json,
    Json as RequestJson,
};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::logic::{FormPostHandler, FormPostResponse};
use crate::model::{Node, NodeRef};
use crate::store::traits::NodeResolver;

/// Shared dependencies of the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub forms: Arc<FormPostHandler>,
    pub nodes: Arc<dyn NodeResolver>,
}

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NodeQuery {
    #[serde(rename = "nodeRef")]
    pub node_ref: String,
}

/// Raw `item_kind` and `item_id` segments of a form processor path
fn form_path_segments(path: &str) -> Option<(&str, &str)> {
    path.strip_prefix("/api/")?
        .strip_suffix("/formprocessor")?
        .split_once('/')
}

/// POST /api/{item_kind}/{item_id}/formprocessor
/// Persist form data for an item and extract metadata when document content changed.
///
/// The segments are read from the request path still percent-encoded, so an
/// item id such as `workspace%3A%2F%2FSpacesStore%2Fabc` is decoded exactly once.
pub async fn post_form(
    State(state): State<AppState>,
    uri: Uri,
    body: Option<RequestJson<Map<String, Value>>>,
) -> Result<Json<FormPostResponse>, (StatusCode, Json<ErrorResponse>)> {
    let (item_kind, item_id) = form_path_segments(uri.path()).unwrap_or_default();

    match state
        .forms
        .post(item_kind, item_id, body.map(|RequestJson(body)| body))
        .await
    {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            let status = e.status_code();
            if status.is_server_error() {
                warn!("Form post for [{}] {} failed: {}", item_kind, item_id, e);
            }
            Err((status, Json(ErrorResponse::new(&e.to_string()))))
        }
    }
}

/// GET /api/node?nodeRef={node_ref}
pub async fn get_node(
    State(state): State<AppState>,
    Query(query): Query<NodeQuery>,
) -> Result<Json<Node>, (StatusCode, Json<ErrorResponse>)> {
    if let Err(e) = query.node_ref.parse::<NodeRef>() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(&e.to_string())),
        ));
    }

    match state.nodes.find_node(&query.node_ref).await {
        Ok(Some(node)) => Ok(Json(node)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Node not found")),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(&e.to_string())),
        )),
    }
}
