use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use metrics::counter;
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::{
    application::error::HttpError,
    cache::{ChangeNotification, apply_notification},
};

use super::RouterState;

pub const WEBHOOK_TOKEN_HEADER: &str = "x-webhook-token";
const SOURCE: &str = "infra::http::webhooks";

#[derive(Debug, Serialize)]
pub(super) struct InvalidationResponse {
    pub evicted: usize,
}

pub(super) async fn receive_change(
    State(state): State<RouterState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<InvalidationResponse>, HttpError> {
    if let Some(expected) = state.webhook_token_hash.as_deref() {
        let presented = headers
            .get(WEBHOOK_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(hash_token);
        let authorized = presented
            .is_some_and(|presented| expected.ct_eq(presented.as_slice()).unwrap_u8() == 1);
        if !authorized {
            warn!(target = SOURCE, "rejected change notification with bad token");
            return Err(HttpError::new(
                SOURCE,
                StatusCode::UNAUTHORIZED,
                "Invalid webhook token",
                "webhook token missing or mismatched",
            ));
        }
    }

    let notification: ChangeNotification = serde_json::from_slice(&body).map_err(|err| {
        HttpError::from_error(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid change notification",
            &err,
        )
    })?;

    counter!("blockpress_webhook_received_total").increment(1);
    let evicted = apply_notification(&state.cache, &notification);

    Ok(Json(InvalidationResponse { evicted }))
}

pub(crate) fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.trim().as_bytes());
    hasher.finalize().to_vec()
}
