use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderValue, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};

use crate::{application::error::HttpError, domain::ids::PageId};

use super::RouterState;

pub(super) async fn document_json(
    State(state): State<RouterState>,
    Path(page_id): Path<String>,
) -> Result<Response, HttpError> {
    let page_id = PageId::parse(&page_id)?;
    let document = state.documents.render_document(&page_id).await?;
    Ok(Json(document.as_ref().clone()).into_response())
}

pub(super) async fn document_html(
    State(state): State<RouterState>,
    Path(page_id): Path<String>,
) -> Result<Response, HttpError> {
    let page_id = PageId::parse(&page_id)?;
    let document = state.documents.render_document(&page_id).await?;

    let mut response = document.html.clone().into_response();
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    Ok(response)
}
