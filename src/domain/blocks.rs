//! Block tree model.
//!
//! A document is an ordered sequence of [`Block`]s. Each block owns its children, which are
//! populated by the fetcher before the tree reaches the renderer and never mutated afterwards.

use serde::Serialize;

use super::rich_text::{Color, RichTextSpan};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub id: String,
    pub kind: BlockKind,
    pub has_children: bool,
    pub children: Vec<Block>,
}

impl Block {
    pub fn new(id: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            kind,
            has_children: false,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.has_children = !children.is_empty();
        self.children = children;
        self
    }

    /// Wire name of the block variant, e.g. `bulleted_list_item`.
    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    pub fn list_kind(&self) -> Option<ListKind> {
        match self.kind {
            BlockKind::BulletedListItem(_) => Some(ListKind::Bulleted),
            BlockKind::NumberedListItem(_) => Some(ListKind::Numbered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph(TextContent),
    #[serde(rename = "heading_1")]
    Heading1(TextContent),
    #[serde(rename = "heading_2")]
    Heading2(TextContent),
    #[serde(rename = "heading_3")]
    Heading3(TextContent),
    BulletedListItem(TextContent),
    NumberedListItem(TextContent),
    Code(CodeContent),
    Image(MediaContent),
    Divider,
    Quote(TextContent),
    Callout(CalloutContent),
    Toggle(TextContent),
    Embed(MediaContent),
    Video(MediaContent),
    Table(TableContent),
    TableRow(TableRowContent),
    ToDo(ToDoContent),
    RawMarkup(RawMarkupContent),
    Unsupported(UnsupportedContent),
}

impl BlockKind {
    pub fn type_name(&self) -> &str {
        match self {
            BlockKind::Paragraph(_) => "paragraph",
            BlockKind::Heading1(_) => "heading_1",
            BlockKind::Heading2(_) => "heading_2",
            BlockKind::Heading3(_) => "heading_3",
            BlockKind::BulletedListItem(_) => "bulleted_list_item",
            BlockKind::NumberedListItem(_) => "numbered_list_item",
            BlockKind::Code(_) => "code",
            BlockKind::Image(_) => "image",
            BlockKind::Divider => "divider",
            BlockKind::Quote(_) => "quote",
            BlockKind::Callout(_) => "callout",
            BlockKind::Toggle(_) => "toggle",
            BlockKind::Embed(_) => "embed",
            BlockKind::Video(_) => "video",
            BlockKind::Table(_) => "table",
            BlockKind::TableRow(_) => "table_row",
            BlockKind::ToDo(_) => "to_do",
            BlockKind::RawMarkup(_) => "raw_markup",
            BlockKind::Unsupported(content) => &content.raw_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bulleted,
    Numbered,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TextContent {
    pub rich_text: Vec<RichTextSpan>,
    pub color: Color,
}

impl TextContent {
    pub fn new(rich_text: Vec<RichTextSpan>) -> Self {
        Self {
            rich_text,
            color: Color::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CodeContent {
    pub rich_text: Vec<RichTextSpan>,
    pub language: String,
    pub caption: Vec<RichTextSpan>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MediaContent {
    pub source: Option<MediaSource>,
    pub caption: Vec<RichTextSpan>,
}

impl MediaContent {
    pub fn external(url: impl Into<String>) -> Self {
        Self {
            source: Some(MediaSource::External { url: url.into() }),
            caption: Vec::new(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.source.as_ref().map(MediaSource::url)
    }
}

/// Where a media block's content lives: an author-supplied URL or a file hosted by the
/// content service behind a short-lived signed URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaSource {
    External {
        url: String,
    },
    Hosted {
        url: String,
        expiry_time: Option<String>,
    },
}

impl MediaSource {
    pub fn url(&self) -> &str {
        match self {
            MediaSource::External { url } | MediaSource::Hosted { url, .. } => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CalloutIcon {
    Emoji(String),
    Image(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CalloutContent {
    pub rich_text: Vec<RichTextSpan>,
    pub icon: Option<CalloutIcon>,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TableContent {
    pub table_width: usize,
    pub has_column_header: bool,
    pub has_row_header: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TableRowContent {
    pub cells: Vec<Vec<RichTextSpan>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ToDoContent {
    pub rich_text: Vec<RichTextSpan>,
    pub checked: bool,
}

/// Author-supplied markup that is inserted into the page and cleaned by the sanitizer.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RawMarkupContent {
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct UnsupportedContent {
    pub raw_type: String,
    pub rich_text: Vec<RichTextSpan>,
}
