use async_trait::async_trait;
use reqwest::{
    Client, StatusCode, Url,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::application::source::{ChildrenPage, ContentSource, FetchError, PageMetadata};
use crate::config::ContentSettings;
use crate::infra::error::InfraError;

use super::parser::{ListResponse, PageResponse};

const SOURCE: &str = "infra::notion::client";
const VERSION_HEADER: &str = "notion-version";

/// HTTP adapter for the block-based content service.
#[derive(Clone, Debug)]
pub struct NotionClient {
    client: Client,
    base: Url,
}

impl NotionClient {
    pub fn new(settings: &ContentSettings) -> Result<Self, InfraError> {
        let mut headers = HeaderMap::new();
        let version = HeaderValue::from_str(&settings.api_version)
            .map_err(|err| InfraError::configuration(format!("invalid api version: {err}")))?;
        headers.insert(VERSION_HEADER, version);
        if let Some(token) = settings.api_token.as_deref() {
            let mut bearer = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|err| InfraError::configuration(format!("invalid api token: {err}")))?;
            bearer.set_sensitive(true);
            headers.insert(AUTHORIZATION, bearer);
        }

        let client = Client::builder()
            .user_agent(Self::user_agent())
            .default_headers(headers)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        Ok(Self {
            client,
            base: settings.base_url.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("blockpress/", env!("CARGO_PKG_VERSION"))
    }

    fn url(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::transport(format!("base url `{}` cannot hold a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, resource: &str) -> Result<T, FetchError> {
        debug!(target = SOURCE, url = %url, "requesting content service");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(FetchError::transport)?;

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::not_found(resource));
        }
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            return Err(FetchError::Status {
                status: status.as_u16(),
                resource: resource.to_string(),
                message: error_message(&body),
            });
        }

        serde_json::from_slice(&bytes).map_err(FetchError::decode)
    }
}

#[async_trait]
impl ContentSource for NotionClient {
    async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<ChildrenPage, FetchError> {
        let mut url = self.url(&["v1", "blocks", block_id, "children"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page_size", &page_size.to_string());
            if let Some(cursor) = cursor {
                query.append_pair("start_cursor", cursor);
            }
        }

        let resource = format!("block {block_id}");
        let response: ListResponse = self.get_json(url, &resource).await?;
        Ok(response.into_page())
    }

    async fn page_metadata(&self, page_id: &str) -> Result<PageMetadata, FetchError> {
        let url = self.url(&["v1", "pages", page_id])?;
        let resource = format!("page {page_id}");
        let response: PageResponse = self.get_json(url, &resource).await?;
        Ok(response.into_metadata())
    }
}

/// The `message` field of an error body, or the raw body when it has none.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
