//! Change notifications delivered by the content service.

use serde::{Deserialize, Serialize};

/// Body of a change notification, e.g.
///
/// ```json
/// { "type": "block.updated", "entity": { "id": "…", "type": "block" }, "page_id": "…" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotification {
    #[serde(rename = "type")]
    pub event_type: String,
    pub entity: NotificationEntity,
    /// Page that owns the changed entity, when the sender knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<NotificationData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEntity {
    pub id: String,
    #[serde(rename = "type", default)]
    pub entity_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    #[serde(default)]
    pub parent: Option<NotificationEntity>,
}

/// What part of the content a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Block,
    Page,
    Database,
    Other,
}

impl ChangeNotification {
    pub fn new(event_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            entity: NotificationEntity {
                id: entity_id.into(),
                entity_type: None,
            },
            page_id: None,
            data: None,
        }
    }

    pub fn with_page_id(mut self, page_id: impl Into<String>) -> Self {
        self.page_id = Some(page_id.into());
        self
    }

    pub fn kind(&self) -> EventKind {
        match self.event_type.split_once('.').map(|(prefix, _)| prefix) {
            Some("block") => EventKind::Block,
            Some("page") => EventKind::Page,
            Some("database") => EventKind::Database,
            _ => EventKind::Other,
        }
    }

    /// Raw id of the page whose cached output is affected.
    ///
    /// Uses the explicit `page_id` first, then a page parent, then the entity itself.
    pub fn affected_page(&self) -> &str {
        if let Some(page_id) = self.page_id.as_deref() {
            return page_id;
        }

        let page_parent = self
            .data
            .as_ref()
            .and_then(|data| data.parent.as_ref())
            .filter(|parent| parent.entity_type.as_deref() == Some("page"));
        match page_parent {
            Some(parent) => &parent.id,
            None => &self.entity.id,
        }
    }
}
