use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DomainError;

/// Identifier of a page or block on the content service.
///
/// The service accepts ids both with and without hyphens; every id that parses as a UUID is
/// stored in its hyphenated lowercase form so that cache keys derived from request paths and
/// from webhook payloads agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageId(String);

impl PageId {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("page id must not be empty"));
        }
        if trimmed
            .chars()
            .any(|ch| ch.is_whitespace() || matches!(ch, '*' | '/' | ':' | '?' | '#'))
        {
            return Err(DomainError::validation(format!(
                "page id `{trimmed}` contains reserved characters"
            )));
        }

        Ok(Self(normalize_id(trimmed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PageId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PageId> for String {
    fn from(value: PageId) -> Self {
        value.0
    }
}

/// Hyphenated lowercase UUID when `raw` is one, otherwise the lowercased input.
pub fn normalize_id(raw: &str) -> String {
    match Uuid::try_parse(raw.trim()) {
        Ok(uuid) => uuid.hyphenated().to_string(),
        Err(_) => raw.trim().to_ascii_lowercase(),
    }
}
