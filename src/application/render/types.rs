use thiserror::Error;

/// Nesting depth past which blocks are replaced by an error placeholder.
pub const DEFAULT_MAX_RENDER_DEPTH: usize = 8;

/// Per-call rendering state. Copied, never shared, so sibling renders cannot interfere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderContext {
    /// Nesting depth of the block being rendered; top-level blocks are at depth 0.
    pub depth: usize,
    /// Run the allow-list sanitizer over the assembled document.
    pub sanitize: bool,
    pub max_depth: usize,
}

impl RenderContext {
    pub fn new(sanitize: bool, max_depth: usize) -> Self {
        Self {
            depth: 0,
            sanitize,
            max_depth,
        }
    }

    /// Context for the children of the block currently being rendered.
    pub fn descend(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(true, DEFAULT_MAX_RENDER_DEPTH)
    }
}

/// Failure to render a single block. Surfaced in the output as a placeholder element.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("block `{block_id}` is nested {depth} levels deep (limit {limit})")]
    Nesting {
        block_id: String,
        depth: usize,
        limit: usize,
    },
    #[error("block `{block_id}` is malformed: {message}")]
    Structure { block_id: String, message: String },
    #[error("{kind} block `{block_id}` has no usable source url")]
    Media { block_id: String, kind: String },
}

impl RenderError {
    pub fn structure(block_id: &str, message: impl Into<String>) -> Self {
        Self::Structure {
            block_id: block_id.to_string(),
            message: message.into(),
        }
    }

    /// Short machine-readable name, emitted as `data-error-kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::Nesting { .. } => "nesting",
            RenderError::Structure { .. } => "structure",
            RenderError::Media { .. } => "media",
        }
    }
}
