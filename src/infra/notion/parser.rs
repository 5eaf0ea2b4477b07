//! Wire payloads of the content service and their mapping onto domain blocks.

use std::collections::HashMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::application::source::{BlockRecord, ChildrenPage, PageMetadata};
use crate::domain::blocks::{
    BlockKind, CalloutContent, CalloutIcon, CodeContent, MediaContent, MediaSource,
    RawMarkupContent, TableContent, TableRowContent, TextContent, ToDoContent, UnsupportedContent,
};
use crate::domain::ids::normalize_id;
use crate::domain::rich_text::{Color, RichTextSpan, plain_text};

const SOURCE: &str = "infra::notion::parser";
/// Caption that turns an `html` code block into markup inserted as-is.
const RAW_MARKUP_CAPTION: &str = "raw";

#[derive(Debug, Deserialize)]
pub(super) struct ListResponse {
    #[serde(default)]
    results: Vec<RawBlock>,
    #[serde(default)]
    next_cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    id: String,
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    has_children: bool,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    in_trash: bool,
    #[serde(flatten)]
    payloads: HashMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TextPayload {
    rich_text: Vec<RichTextSpan>,
    color: Color,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CodePayload {
    rich_text: Vec<RichTextSpan>,
    language: String,
    caption: Vec<RichTextSpan>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MediaPayload {
    #[serde(rename = "type")]
    source_type: Option<String>,
    external: Option<FileRef>,
    file: Option<FileRef>,
    /// Embeds carry their URL directly.
    url: Option<String>,
    caption: Vec<RichTextSpan>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileRef {
    url: String,
    #[serde(default)]
    expiry_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CalloutPayload {
    rich_text: Vec<RichTextSpan>,
    icon: Option<IconPayload>,
    color: Color,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IconPayload {
    emoji: Option<String>,
    external: Option<FileRef>,
    file: Option<FileRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TablePayload {
    table_width: usize,
    has_column_header: bool,
    has_row_header: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TableRowPayload {
    cells: Vec<Vec<RichTextSpan>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ToDoPayload {
    rich_text: Vec<RichTextSpan>,
    checked: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct PageResponse {
    id: String,
    #[serde(default)]
    cover: Option<MediaPayload>,
    #[serde(default)]
    properties: HashMap<String, PropertyPayload>,
}

#[derive(Debug, Deserialize)]
struct PropertyPayload {
    #[serde(rename = "type")]
    property_type: String,
    #[serde(default)]
    title: Vec<RichTextSpan>,
}

impl ListResponse {
    pub(super) fn into_page(self) -> ChildrenPage {
        let blocks = self
            .results
            .into_iter()
            .filter(|raw| !raw.archived && !raw.in_trash)
            .map(RawBlock::into_record)
            .collect();
        ChildrenPage {
            blocks,
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        }
    }
}

impl RawBlock {
    fn into_record(mut self) -> BlockRecord {
        let payload = self.payloads.remove(&self.block_type).unwrap_or(Value::Null);
        let kind = parse_kind(&self.id, &self.block_type, payload);
        BlockRecord::new(normalize_id(&self.id), kind).with_has_children(self.has_children)
    }
}

fn parse_kind(block_id: &str, block_type: &str, payload: Value) -> BlockKind {
    let parsed = match block_type {
        "paragraph" => decode(payload).map(|text| BlockKind::Paragraph(text_content(text))),
        "heading_1" => decode(payload).map(|text| BlockKind::Heading1(text_content(text))),
        "heading_2" => decode(payload).map(|text| BlockKind::Heading2(text_content(text))),
        "heading_3" => decode(payload).map(|text| BlockKind::Heading3(text_content(text))),
        "bulleted_list_item" => {
            decode(payload).map(|text| BlockKind::BulletedListItem(text_content(text)))
        }
        "numbered_list_item" => {
            decode(payload).map(|text| BlockKind::NumberedListItem(text_content(text)))
        }
        "quote" => decode(payload).map(|text| BlockKind::Quote(text_content(text))),
        "toggle" => decode(payload).map(|text| BlockKind::Toggle(text_content(text))),
        "code" => decode(payload).map(code_kind),
        "image" => decode(payload).map(|media| BlockKind::Image(media_content(media))),
        "video" => decode(payload).map(|media| BlockKind::Video(media_content(media))),
        "embed" => decode(payload).map(|media| BlockKind::Embed(media_content(media))),
        "divider" => Ok(BlockKind::Divider),
        "callout" => decode(payload).map(callout_kind),
        "table" => decode(payload).map(|table: TablePayload| {
            BlockKind::Table(TableContent {
                table_width: table.table_width,
                has_column_header: table.has_column_header,
                has_row_header: table.has_row_header,
            })
        }),
        "table_row" => decode(payload)
            .map(|row: TableRowPayload| BlockKind::TableRow(TableRowContent { cells: row.cells })),
        "to_do" => decode(payload).map(|todo: ToDoPayload| {
            BlockKind::ToDo(ToDoContent {
                rich_text: todo.rich_text,
                checked: todo.checked,
            })
        }),
        other => Ok(unsupported(other, &payload)),
    };

    parsed.unwrap_or_else(|err| {
        warn!(
            target = SOURCE,
            block_id,
            block_type,
            error = %err,
            "block payload could not be decoded; rendering as unsupported"
        );
        BlockKind::Unsupported(UnsupportedContent {
            raw_type: block_type.to_string(),
            rich_text: Vec::new(),
        })
    })
}

fn decode<T: DeserializeOwned + Default>(payload: Value) -> Result<T, serde_json::Error> {
    if payload.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(payload)
}

fn text_content(payload: TextPayload) -> TextContent {
    TextContent {
        rich_text: payload.rich_text,
        color: payload.color,
    }
}

fn code_kind(payload: CodePayload) -> BlockKind {
    let is_raw_markup = payload.language.eq_ignore_ascii_case("html")
        && plain_text(&payload.caption)
            .trim()
            .eq_ignore_ascii_case(RAW_MARKUP_CAPTION);
    if is_raw_markup {
        return BlockKind::RawMarkup(RawMarkupContent {
            html: plain_text(&payload.rich_text),
        });
    }

    BlockKind::Code(CodeContent {
        rich_text: payload.rich_text,
        language: payload.language,
        caption: payload.caption,
    })
}

fn media_content(payload: MediaPayload) -> MediaContent {
    let source = media_source(&payload);
    MediaContent {
        source,
        caption: payload.caption,
    }
}

fn media_source(payload: &MediaPayload) -> Option<MediaSource> {
    let external = payload.external.as_ref().map(|file| MediaSource::External {
        url: file.url.clone(),
    });
    let hosted = payload.file.as_ref().map(|file| MediaSource::Hosted {
        url: file.url.clone(),
        expiry_time: file.expiry_time.clone(),
    });
    let direct = payload
        .url
        .as_ref()
        .map(|url| MediaSource::External { url: url.clone() });

    let preferred = match payload.source_type.as_deref() {
        Some("file") => hosted.or(external),
        _ => external.or(hosted),
    };
    preferred
        .or(direct)
        .filter(|source| !source.url().trim().is_empty())
}

fn callout_kind(payload: CalloutPayload) -> BlockKind {
    let icon = payload.icon.and_then(|icon| {
        if let Some(emoji) = icon.emoji {
            return Some(CalloutIcon::Emoji(emoji));
        }
        icon.external
            .or(icon.file)
            .map(|file| CalloutIcon::Image(file.url))
    });

    BlockKind::Callout(CalloutContent {
        rich_text: payload.rich_text,
        icon,
        color: payload.color,
    })
}

/// Keep whatever text an unknown block type carries so the placeholder is not empty.
fn unsupported(block_type: &str, payload: &Value) -> BlockKind {
    let rich_text = payload
        .get("rich_text")
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default();
    BlockKind::Unsupported(UnsupportedContent {
        raw_type: block_type.to_string(),
        rich_text,
    })
}

impl PageResponse {
    pub(super) fn into_metadata(self) -> PageMetadata {
        let title = self
            .properties
            .values()
            .find(|property| property.property_type == "title")
            .map(|property| plain_text(&property.title))
            .filter(|title| !title.trim().is_empty());
        let cover_url = self
            .cover
            .as_ref()
            .and_then(media_source)
            .map(|source| source.url().to_string());

        PageMetadata {
            id: normalize_id(&self.id),
            title,
            cover_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse_block(value: Value) -> BlockRecord {
        let raw: RawBlock = serde_json::from_value(value).expect("raw block");
        raw.into_record()
    }

    fn text(content: &str) -> Value {
        json!({
            "type": "text",
            "text": { "content": content, "link": null },
            "annotations": {
                "bold": false, "italic": false, "strikethrough": false,
                "underline": false, "code": false, "color": "default"
            },
            "plain_text": content,
            "href": null
        })
    }

    #[test]
    fn paragraph_with_annotations_and_link() {
        let record = parse_block(json!({
            "object": "block",
            "id": "59833787-2cf9-4fdf-8782-e53db20768a5",
            "type": "paragraph",
            "has_children": true,
            "paragraph": {
                "rich_text": [{
                    "type": "text",
                    "text": { "content": "docs", "link": { "url": "https://example.com" } },
                    "annotations": { "bold": true, "color": "red_background" },
                    "plain_text": "docs",
                    "href": "https://example.com"
                }],
                "color": "blue"
            }
        }));

        assert!(record.has_children);
        let BlockKind::Paragraph(content) = record.kind else {
            panic!("expected paragraph, got {:?}", record.kind);
        };
        assert_eq!(content.color, Color::Blue);
        let span = &content.rich_text[0];
        assert_eq!(span.text, "docs");
        assert!(span.annotations.bold);
        assert_eq!(span.annotations.color, Color::RedBackground);
        assert_eq!(span.link.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn ids_are_normalized() {
        let record = parse_block(json!({
            "id": "598337872CF94FDF8782E53DB20768A5",
            "type": "divider",
            "divider": {}
        }));
        assert_eq!(record.id, "59833787-2cf9-4fdf-8782-e53db20768a5");
        assert_eq!(record.kind, BlockKind::Divider);
    }

    #[test]
    fn hosted_and_external_media_sources() {
        let hosted = parse_block(json!({
            "id": "a",
            "type": "image",
            "image": {
                "type": "file",
                "file": { "url": "https://files.test/a.png", "expiry_time": "2026-01-01T00:00:00.000Z" },
                "caption": [text("Figure")]
            }
        }));
        let BlockKind::Image(media) = hosted.kind else {
            panic!("expected image");
        };
        assert_eq!(
            media.source,
            Some(MediaSource::Hosted {
                url: "https://files.test/a.png".to_string(),
                expiry_time: Some("2026-01-01T00:00:00.000Z".to_string()),
            })
        );
        assert_eq!(plain_text(&media.caption), "Figure");

        let external = parse_block(json!({
            "id": "b",
            "type": "video",
            "video": { "type": "external", "external": { "url": "https://youtu.be/dQw4w9WgXcQ" } }
        }));
        let BlockKind::Video(media) = external.kind else {
            panic!("expected video");
        };
        assert_eq!(media.url(), Some("https://youtu.be/dQw4w9WgXcQ"));
    }

    #[test]
    fn embed_url_is_read_directly() {
        let record = parse_block(json!({
            "id": "e",
            "type": "embed",
            "embed": { "url": "https://codepen.io/pen/abc", "caption": [] }
        }));
        let BlockKind::Embed(media) = record.kind else {
            panic!("expected embed");
        };
        assert_eq!(media.url(), Some("https://codepen.io/pen/abc"));
    }

    #[test]
    fn media_without_url_has_no_source() {
        let record = parse_block(json!({ "id": "i", "type": "image", "image": { "caption": [] } }));
        let BlockKind::Image(media) = record.kind else {
            panic!("expected image");
        };
        assert_eq!(media.source, None);
    }

    #[test]
    fn html_code_captioned_raw_becomes_raw_markup() {
        let record = parse_block(json!({
            "id": "c",
            "type": "code",
            "code": {
                "rich_text": [text("<div class=\"chart\"></div>")],
                "language": "html",
                "caption": [text(" Raw ")]
            }
        }));
        assert_eq!(
            record.kind,
            BlockKind::RawMarkup(RawMarkupContent {
                html: "<div class=\"chart\"></div>".to_string()
            })
        );
    }

    #[test]
    fn html_code_without_marker_stays_code() {
        let record = parse_block(json!({
            "id": "c",
            "type": "code",
            "code": { "rich_text": [text("<b>hi</b>")], "language": "html", "caption": [] }
        }));
        assert!(matches!(record.kind, BlockKind::Code(ref code) if code.language == "html"));
    }

    #[test]
    fn callout_icons() {
        let emoji = parse_block(json!({
            "id": "c1",
            "type": "callout",
            "callout": { "rich_text": [text("Note")], "icon": { "type": "emoji", "emoji": "💡" }, "color": "gray_background" }
        }));
        let BlockKind::Callout(callout) = emoji.kind else {
            panic!("expected callout");
        };
        assert_eq!(callout.icon, Some(CalloutIcon::Emoji("💡".to_string())));
        assert_eq!(callout.color, Color::GrayBackground);

        let image = parse_block(json!({
            "id": "c2",
            "type": "callout",
            "callout": { "rich_text": [], "icon": { "type": "external", "external": { "url": "https://icons.test/i.svg" } } }
        }));
        let BlockKind::Callout(callout) = image.kind else {
            panic!("expected callout");
        };
        assert_eq!(
            callout.icon,
            Some(CalloutIcon::Image("https://icons.test/i.svg".to_string()))
        );
    }

    #[test]
    fn table_and_rows() {
        let table = parse_block(json!({
            "id": "t",
            "type": "table",
            "has_children": true,
            "table": { "table_width": 2, "has_column_header": true, "has_row_header": false }
        }));
        assert_eq!(
            table.kind,
            BlockKind::Table(TableContent {
                table_width: 2,
                has_column_header: true,
                has_row_header: false,
            })
        );

        let row = parse_block(json!({
            "id": "r",
            "type": "table_row",
            "table_row": { "cells": [[text("a")], [text("b")]] }
        }));
        let BlockKind::TableRow(row) = row.kind else {
            panic!("expected table row");
        };
        assert_eq!(row.cells.len(), 2);
    }

    #[test]
    fn unknown_types_keep_their_text() {
        let record = parse_block(json!({
            "id": "s",
            "type": "synced_block",
            "synced_block": { "rich_text": [text("mirror")] }
        }));
        let BlockKind::Unsupported(content) = record.kind else {
            panic!("expected unsupported");
        };
        assert_eq!(content.raw_type, "synced_block");
        assert_eq!(plain_text(&content.rich_text), "mirror");
    }

    #[test]
    fn malformed_payload_degrades_to_unsupported() {
        let record = parse_block(json!({
            "id": "bad",
            "type": "to_do",
            "to_do": { "rich_text": "not a list", "checked": true }
        }));
        assert!(matches!(
            record.kind,
            BlockKind::Unsupported(ref content) if content.raw_type == "to_do"
        ));
    }

    #[test]
    fn archived_and_trashed_blocks_are_skipped() {
        let response: ListResponse = serde_json::from_value(json!({
            "object": "list",
            "results": [
                { "id": "keep", "type": "divider", "divider": {} },
                { "id": "gone", "type": "divider", "archived": true, "divider": {} },
                { "id": "bin", "type": "divider", "in_trash": true, "divider": {} }
            ],
            "next_cursor": "cursor-2",
            "has_more": true
        }))
        .expect("list response");

        let page = response.into_page();
        let ids: Vec<_> = page.blocks.iter().map(|block| block.id.as_str()).collect();
        assert_eq!(ids, ["keep"]);
        assert_eq!(page.next_cursor.as_deref(), Some("cursor-2"));
        assert!(page.has_more);
    }

    #[test]
    fn page_title_and_cover() {
        let response: PageResponse = serde_json::from_value(json!({
            "object": "page",
            "id": "59833787-2cf9-4fdf-8782-e53db20768a5",
            "cover": { "type": "external", "external": { "url": "https://img.test/cover.jpg" } },
            "properties": {
                "Tags": { "id": "x", "type": "multi_select", "multi_select": [] },
                "Name": { "id": "title", "type": "title", "title": [text("Hello "), text("world")] }
            }
        }))
        .expect("page response");

        let metadata = response.into_metadata();
        assert_eq!(metadata.title.as_deref(), Some("Hello world"));
        assert_eq!(metadata.cover_url.as_deref(), Some("https://img.test/cover.jpg"));
    }
}
