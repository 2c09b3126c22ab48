use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers::{self, AppState};

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Form processing
        .route(
            "/api/:item_kind/:item_id/formprocessor",
            post(handlers::post_form),
        )
        // Node lookup
        .route("/api/node", get(handlers::get_node))
}
