//! Content service adapter trait.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::domain::blocks::{Block, BlockKind};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to content service failed: {message}")]
    Transport { message: String },
    #[error("content service answered {status} for `{resource}`: {message}")]
    Status {
        status: u16,
        resource: String,
        message: String,
    },
    #[error("could not decode content service response: {message}")]
    Decode { message: String },
    #[error("`{resource}` does not exist on the content service")]
    NotFound { resource: String },
    #[error("children of `{parent_id}` could not be listed completely: {reason}")]
    Incomplete {
        parent_id: String,
        reason: &'static str,
    },
}

impl FetchError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn incomplete(parent_id: impl Into<String>, reason: &'static str) -> Self {
        Self::Incomplete {
            parent_id: parent_id.into(),
            reason,
        }
    }
}

/// A block as listed by the content service, before its children are fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockRecord {
    pub id: String,
    pub kind: BlockKind,
    pub has_children: bool,
}

impl BlockRecord {
    pub fn new(id: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            kind,
            has_children: false,
        }
    }

    pub fn with_has_children(mut self, has_children: bool) -> Self {
        self.has_children = has_children;
        self
    }

    pub fn into_block(self, children: Vec<Block>) -> Block {
        Block {
            id: self.id,
            kind: self.kind,
            has_children: self.has_children,
            children,
        }
    }
}

/// One page of a paginated children listing.
#[derive(Debug, Clone, Default)]
pub struct ChildrenPage {
    pub blocks: Vec<BlockRecord>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    pub id: String,
    pub title: Option<String>,
    pub cover_url: Option<String>,
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// List one page of the direct children of `block_id`.
    async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<ChildrenPage, FetchError>;

    async fn page_metadata(&self, page_id: &str) -> Result<PageMetadata, FetchError>;
}
