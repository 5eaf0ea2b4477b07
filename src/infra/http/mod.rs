//! HTTP surface: rendered documents, change-notification webhook and health.

mod documents;
mod middleware;
mod webhooks;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    middleware as axum_middleware,
    routing::{get, post},
};
use serde::Serialize;

use crate::{application::document::DocumentService, cache::ContentCache};

pub use middleware::RequestContext;
pub use webhooks::WEBHOOK_TOKEN_HEADER;

#[derive(Clone)]
pub struct RouterState {
    pub documents: Arc<DocumentService>,
    pub cache: Arc<ContentCache>,
    /// SHA-256 of the shared webhook token; `None` leaves the webhook open.
    pub webhook_token_hash: Option<Arc<Vec<u8>>>,
}

impl RouterState {
    pub fn new(
        documents: Arc<DocumentService>,
        cache: Arc<ContentCache>,
        webhook_token: Option<&str>,
    ) -> Self {
        Self {
            documents,
            cache,
            webhook_token_hash: webhook_token.map(|token| Arc::new(webhooks::hash_token(token))),
        }
    }
}

pub fn build_router(state: RouterState) -> Router {
    Router::new()
        .route("/documents/{page_id}", get(documents::document_json))
        .route("/documents/{page_id}/html", get(documents::document_html))
        .route("/webhooks/content", post(webhooks::receive_change))
        .route("/_health", get(health))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    cache_entries: usize,
}

async fn health(State(state): State<RouterState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cache_entries: state.cache.size(),
    })
}
