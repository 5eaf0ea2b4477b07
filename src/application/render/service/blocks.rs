//! Per-variant block markup.
//!
//! `render_block` never fails: an error while rendering a block replaces that block with a
//! placeholder element carrying the block id, its type and the error kind, and rendering of
//! its siblings carries on.

use tracing::warn;

use crate::application::render::types::{RenderContext, RenderError};
use crate::domain::blocks::{
    Block, BlockKind, CalloutContent, CalloutIcon, CodeContent, ListKind, MediaContent,
    TableContent, TableRowContent, TextContent, ToDoContent,
};
use crate::domain::rich_text::{Color, RichTextSpan, plain_text};

use super::balance::remove_surplus_closing_tags;
use super::lists::render_sequence;
use super::media::embed_url;
use super::rich_text::{escape_html, render_spans};

/// Render one block and its children.
pub fn render_block(block: &Block, context: RenderContext) -> String {
    match try_render_block(block, context) {
        Ok(html) => html,
        Err(err) => {
            warn!(
                target = "application::render::blocks",
                block_id = %block.id,
                block_type = block.type_name(),
                depth = context.depth,
                error = %err,
                "block rendered as error placeholder"
            );
            error_placeholder(block, &err)
        }
    }
}

fn try_render_block(block: &Block, context: RenderContext) -> Result<String, RenderError> {
    if context.depth > context.max_depth {
        return Err(RenderError::Nesting {
            block_id: block.id.clone(),
            depth: context.depth,
            limit: context.max_depth,
        });
    }

    let html = match &block.kind {
        BlockKind::Paragraph(content) => render_paragraph(block, content, context),
        BlockKind::Heading1(content) => render_heading(block, 1, content, context),
        BlockKind::Heading2(content) => render_heading(block, 2, content, context),
        BlockKind::Heading3(content) => render_heading(block, 3, content, context),
        BlockKind::BulletedListItem(content) => {
            render_list_item(block, ListKind::Bulleted, content, context)
        }
        BlockKind::NumberedListItem(content) => {
            render_list_item(block, ListKind::Numbered, content, context)
        }
        BlockKind::Code(content) => render_code(content),
        BlockKind::Image(content) => render_image(block, content)?,
        BlockKind::Video(content) => render_video(block, content)?,
        BlockKind::Embed(content) => render_embed(block, content)?,
        BlockKind::Divider => "<hr class=\"notion-divider\" />".to_string(),
        BlockKind::Quote(content) => render_quote(block, content, context),
        BlockKind::Callout(content) => render_callout(block, content, context),
        BlockKind::Toggle(content) => render_toggle(block, content, context),
        BlockKind::Table(content) => render_table(block, content)?,
        BlockKind::TableRow(_) => {
            return Err(RenderError::structure(
                &block.id,
                "table row outside of a table",
            ));
        }
        BlockKind::ToDo(content) => render_to_do(block, content, context),
        BlockKind::RawMarkup(content) => format!(
            "<div class=\"notion-raw-markup\">{}</div>",
            remove_surplus_closing_tags(&content.html, "div")
        ),
        BlockKind::Unsupported(content) => format!(
            "<div class=\"notion-unsupported\" data-block-type=\"{}\">{}</div>",
            escape_html(&content.raw_type),
            render_spans(&content.rich_text, true)
        ),
    };

    Ok(html)
}

fn error_placeholder(block: &Block, error: &RenderError) -> String {
    format!(
        "<div class=\"notion-error\" data-block-id=\"{}\" data-block-type=\"{}\" data-error-kind=\"{}\"></div>",
        escape_html(&block.id),
        escape_html(block.type_name()),
        error.kind()
    )
}

fn class_list(base: &str, color: Color) -> String {
    match color.css_class() {
        Some(color_class) => format!("{base} {color_class}"),
        None => base.to_string(),
    }
}

/// Children of a text block, grouped and wrapped so they indent under their parent.
fn nested_children(block: &Block, context: RenderContext) -> String {
    if block.children.is_empty() {
        return String::new();
    }
    format!(
        "<div class=\"notion-children\">{}</div>",
        render_sequence(&block.children, context.descend())
    )
}

fn render_paragraph(block: &Block, content: &TextContent, context: RenderContext) -> String {
    let text = render_spans(&content.rich_text, true);
    let base = if text.is_empty() {
        "notion-paragraph notion-blank"
    } else {
        "notion-paragraph"
    };
    format!(
        "<p class=\"{}\">{text}</p>{}",
        class_list(base, content.color),
        nested_children(block, context)
    )
}

fn render_heading(block: &Block, level: u8, content: &TextContent, context: RenderContext) -> String {
    let class = class_list(&format!("notion-h{level}"), content.color);
    format!(
        "<h{level} class=\"{class}\">{}</h{level}>{}",
        render_spans(&content.rich_text, true),
        nested_children(block, context)
    )
}

fn render_list_item(
    block: &Block,
    kind: ListKind,
    content: &TextContent,
    context: RenderContext,
) -> String {
    let mut html = format!(
        "<li class=\"{}\">{}",
        class_list("notion-list-item", content.color),
        render_spans(&content.rich_text, true)
    );

    let child_context = context.descend();
    for run in block
        .children
        .chunk_by(|a, b| a.list_kind().is_some() == b.list_kind().is_some())
    {
        if run[0].list_kind().is_none() {
            html.push_str(&render_sequence(run, child_context));
            continue;
        }
        let items: String = run
            .iter()
            .map(|child| render_block(child, child_context))
            .collect();
        html.push_str(&match kind {
            ListKind::Bulleted => format!("<ul class=\"notion-bulleted-list\">{items}</ul>"),
            ListKind::Numbered => format!("<ol class=\"notion-numbered-list\">{items}</ol>"),
        });
    }

    html.push_str("</li>");
    html
}

fn render_code(content: &CodeContent) -> String {
    let language = language_slug(&content.language);
    let pre = format!(
        "<pre class=\"notion-code\" data-language=\"{language}\"><code class=\"language-{language}\">{}</code></pre>",
        render_spans(&content.rich_text, false)
    );

    if content.caption.is_empty() {
        pre
    } else {
        format!(
            "<figure class=\"notion-code-figure\">{pre}<figcaption>{}</figcaption></figure>",
            render_spans(&content.caption, true)
        )
    }
}

fn language_slug(language: &str) -> String {
    let slug: String = language
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|ch| if ch.is_whitespace() { '-' } else { ch })
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '+' | '#' | '_'))
        .collect();
    if slug.is_empty() {
        "plain".to_string()
    } else {
        slug
    }
}

fn media_url<'a>(block: &Block, content: &'a MediaContent) -> Result<&'a str, RenderError> {
    content
        .url()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| RenderError::Media {
            block_id: block.id.clone(),
            kind: block.type_name().to_string(),
        })
}

fn figcaption(caption: &[RichTextSpan]) -> String {
    if caption.is_empty() {
        String::new()
    } else {
        format!("<figcaption>{}</figcaption>", render_spans(caption, true))
    }
}

fn iframe(src: &str) -> String {
    format!(
        "<iframe class=\"notion-embed-frame\" src=\"{}\" loading=\"lazy\" allowfullscreen=\"\"></iframe>",
        escape_html(src)
    )
}

fn render_image(block: &Block, content: &MediaContent) -> Result<String, RenderError> {
    let url = media_url(block, content)?;
    Ok(format!(
        "<figure class=\"notion-image\"><img src=\"{}\" alt=\"{}\" loading=\"lazy\" />{}</figure>",
        escape_html(url),
        escape_html(&plain_text(&content.caption)),
        figcaption(&content.caption)
    ))
}

fn render_video(block: &Block, content: &MediaContent) -> Result<String, RenderError> {
    let url = media_url(block, content)?;
    let player = match embed_url(url) {
        Some(embed) => iframe(&embed),
        None => format!(
            "<video src=\"{}\" controls=\"\" preload=\"metadata\"></video>",
            escape_html(url)
        ),
    };
    Ok(format!(
        "<figure class=\"notion-video\">{player}{}</figure>",
        figcaption(&content.caption)
    ))
}

fn render_embed(block: &Block, content: &MediaContent) -> Result<String, RenderError> {
    let url = media_url(block, content)?;
    let src = embed_url(url).unwrap_or_else(|| url.to_string());
    Ok(format!(
        "<figure class=\"notion-embed\">{}{}</figure>",
        iframe(&src),
        figcaption(&content.caption)
    ))
}

fn render_quote(block: &Block, content: &TextContent, context: RenderContext) -> String {
    format!(
        "<blockquote class=\"{}\">{}{}</blockquote>",
        class_list("notion-quote", content.color),
        render_spans(&content.rich_text, true),
        nested_children(block, context)
    )
}

fn render_callout(block: &Block, content: &CalloutContent, context: RenderContext) -> String {
    let icon = match &content.icon {
        Some(CalloutIcon::Emoji(emoji)) => format!(
            "<span class=\"notion-callout-icon\" aria-hidden=\"true\">{}</span>",
            escape_html(emoji)
        ),
        Some(CalloutIcon::Image(url)) => format!(
            "<img class=\"notion-callout-icon\" src=\"{}\" alt=\"\" />",
            escape_html(url)
        ),
        None => String::new(),
    };
    format!(
        "<div class=\"{}\">{icon}<div class=\"notion-callout-text\">{}{}</div></div>",
        class_list("notion-callout", content.color),
        render_spans(&content.rich_text, true),
        nested_children(block, context)
    )
}

fn render_toggle(block: &Block, content: &TextContent, context: RenderContext) -> String {
    format!(
        "<details class=\"{}\"><summary>{}</summary><div class=\"notion-toggle-content\">{}</div></details>",
        class_list("notion-toggle", content.color),
        render_spans(&content.rich_text, true),
        render_sequence(&block.children, context.descend())
    )
}

fn render_to_do(block: &Block, content: &ToDoContent, context: RenderContext) -> String {
    let (checked_attr, text_class) = if content.checked {
        (" checked=\"\"", "notion-to-do-text notion-to-do-checked")
    } else {
        ("", "notion-to-do-text")
    };
    format!(
        "<div class=\"notion-to-do\"><input type=\"checkbox\" disabled=\"\"{checked_attr} /><span class=\"{text_class}\">{}</span>{}</div>",
        render_spans(&content.rich_text, true),
        nested_children(block, context)
    )
}

fn render_table(block: &Block, content: &TableContent) -> Result<String, RenderError> {
    let rows = block
        .children
        .iter()
        .map(|child| match &child.kind {
            BlockKind::TableRow(row) => Ok(row),
            other => Err(RenderError::structure(
                &block.id,
                format!("table contains a `{}` block", other.type_name()),
            )),
        })
        .collect::<Result<Vec<&TableRowContent>, _>>()?;

    let width = rows
        .iter()
        .map(|row| row.cells.len())
        .max()
        .unwrap_or(0)
        .max(content.table_width);

    let mut rows = rows.into_iter();
    let mut html = String::from("<div class=\"notion-table-wrapper\"><table class=\"notion-table\">");

    if content.has_column_header
        && let Some(header) = rows.next()
    {
        html.push_str("<thead><tr>");
        for index in 0..width {
            html.push_str(&format!(
                "<th scope=\"col\">{}</th>",
                cell_markup(header, index)
            ));
        }
        html.push_str("</tr></thead>");
    }

    html.push_str("<tbody>");
    for row in rows {
        html.push_str("<tr>");
        for index in 0..width {
            if index == 0 && content.has_row_header {
                html.push_str(&format!("<th scope=\"row\">{}</th>", cell_markup(row, index)));
            } else {
                html.push_str(&format!("<td>{}</td>", cell_markup(row, index)));
            }
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table></div>");

    Ok(html)
}

fn cell_markup(row: &TableRowContent, index: usize) -> String {
    row.cells
        .get(index)
        .map(|cell| render_spans(cell, true))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::blocks::{MediaSource, RawMarkupContent, UnsupportedContent};

    fn text(value: &str) -> TextContent {
        TextContent::new(vec![RichTextSpan::plain(value)])
    }

    fn render(block: &Block) -> String {
        render_block(block, RenderContext::default())
    }

    fn row(id: &str, cells: &[&str]) -> Block {
        Block::new(
            id,
            BlockKind::TableRow(TableRowContent {
                cells: cells
                    .iter()
                    .map(|cell| vec![RichTextSpan::plain(*cell)])
                    .collect(),
            }),
        )
    }

    #[test]
    fn paragraph_and_blank_paragraph() {
        assert_eq!(
            render(&Block::new("p", BlockKind::Paragraph(text("hi")))),
            "<p class=\"notion-paragraph\">hi</p>"
        );
        assert_eq!(
            render(&Block::new("p", BlockKind::Paragraph(TextContent::default()))),
            "<p class=\"notion-paragraph notion-blank\"></p>"
        );
    }

    #[test]
    fn heading_levels_and_colors() {
        let mut content = text("Title");
        content.color = Color::Blue;
        assert_eq!(
            render(&Block::new("h", BlockKind::Heading2(content))),
            "<h2 class=\"notion-h2 notion-color-blue\">Title</h2>"
        );
    }

    #[test]
    fn list_item_children_nest_in_matching_list() {
        let item = Block::new("n1", BlockKind::NumberedListItem(text("parent"))).with_children(
            vec![Block::new("n2", BlockKind::NumberedListItem(text("child")))],
        );

        assert_eq!(
            render(&item),
            "<li class=\"notion-list-item\">parent<ol class=\"notion-numbered-list\">\
             <li class=\"notion-list-item\">child</li></ol></li>"
        );
    }

    #[test]
    fn list_item_keeps_non_list_children_out_of_the_nested_list() {
        let item = Block::new("b1", BlockKind::BulletedListItem(text("parent"))).with_children(
            vec![
                Block::new("p", BlockKind::Paragraph(text("note"))),
                Block::new("b2", BlockKind::BulletedListItem(text("child"))),
                Block::new("b3", BlockKind::BulletedListItem(text("sibling"))),
                Block::new("q", BlockKind::Quote(text("aside"))),
            ],
        );

        let html = render(&item);

        assert_eq!(
            html,
            "<li class=\"notion-list-item\">parent<p class=\"notion-paragraph\">note</p>\
             <ul class=\"notion-bulleted-list\"><li class=\"notion-list-item\">child</li>\
             <li class=\"notion-list-item\">sibling</li></ul>\
             <blockquote class=\"notion-quote\">aside</blockquote></li>"
        );
        assert!(!html.contains("<ul class=\"notion-bulleted-list\"><p"), "{html}");
    }

    #[test]
    fn code_is_escaped_but_not_formatted() {
        let block = Block::new(
            "c",
            BlockKind::Code(CodeContent {
                rich_text: vec![RichTextSpan::plain("a < b && c").bold()],
                language: "Plain Text".to_string(),
                caption: Vec::new(),
            }),
        );
        assert_eq!(
            render(&block),
            "<pre class=\"notion-code\" data-language=\"plain-text\"><code class=\"language-plain-text\">a &lt; b &amp;&amp; c</code></pre>"
        );
    }

    #[test]
    fn image_uses_hosted_source_and_caption_alt() {
        let block = Block::new(
            "i",
            BlockKind::Image(MediaContent {
                source: Some(MediaSource::Hosted {
                    url: "https://files.test/a.png?sig=1&x=2".to_string(),
                    expiry_time: None,
                }),
                caption: vec![RichTextSpan::plain("A \"cat\"")],
            }),
        );
        assert_eq!(
            render(&block),
            "<figure class=\"notion-image\"><img src=\"https://files.test/a.png?sig=1&amp;x=2\" \
             alt=\"A &quot;cat&quot;\" loading=\"lazy\" /><figcaption>A &quot;cat&quot;</figcaption></figure>"
        );
    }

    #[test]
    fn media_without_url_becomes_placeholder() {
        let block = Block::new("img-1", BlockKind::Image(MediaContent::default()));
        assert_eq!(
            render(&block),
            "<div class=\"notion-error\" data-block-id=\"img-1\" data-block-type=\"image\" data-error-kind=\"media\"></div>"
        );
    }

    #[test]
    fn youtube_video_becomes_iframe() {
        let block = Block::new(
            "v",
            BlockKind::Video(MediaContent::external("https://youtu.be/dQw4w9WgXcQ")),
        );
        let html = render(&block);
        assert!(html.contains("src=\"https://www.youtube.com/embed/dQw4w9WgXcQ\""), "{html}");
        assert!(html.starts_with("<figure class=\"notion-video\"><iframe"), "{html}");
    }

    #[test]
    fn plain_video_uses_video_element() {
        let block = Block::new(
            "v",
            BlockKind::Video(MediaContent::external("https://cdn.test/clip.mp4")),
        );
        assert!(render(&block).contains("<video src=\"https://cdn.test/clip.mp4\""));
    }

    #[test]
    fn toggle_renders_children_in_details() {
        let toggle = Block::new("t", BlockKind::Toggle(text("More")))
            .with_children(vec![Block::new("p", BlockKind::Paragraph(text("inside")))]);
        assert_eq!(
            render(&toggle),
            "<details class=\"notion-toggle\"><summary>More</summary>\
             <div class=\"notion-toggle-content\"><p class=\"notion-paragraph\">inside</p></div></details>"
        );
    }

    #[test]
    fn table_with_column_and_row_headers() {
        let table = Block::new(
            "tbl",
            BlockKind::Table(TableContent {
                table_width: 2,
                has_column_header: true,
                has_row_header: true,
            }),
        )
        .with_children(vec![row("r1", &["k", "v"]), row("r2", &["a"])]);

        assert_eq!(
            render(&table),
            "<div class=\"notion-table-wrapper\"><table class=\"notion-table\">\
             <thead><tr><th scope=\"col\">k</th><th scope=\"col\">v</th></tr></thead>\
             <tbody><tr><th scope=\"row\">a</th><td></td></tr></tbody></table></div>"
        );
    }

    #[test]
    fn table_with_foreign_child_is_a_structure_error() {
        let table = Block::new("tbl", BlockKind::Table(TableContent::default()))
            .with_children(vec![Block::new("p", BlockKind::Paragraph(text("x")))]);
        assert!(render(&table).contains("data-error-kind=\"structure\""));
    }

    #[test]
    fn orphan_table_row_is_a_structure_error() {
        assert!(render(&row("r", &["x"])).contains("data-error-kind=\"structure\""));
    }

    #[test]
    fn to_do_reflects_checked_state() {
        let block = Block::new(
            "td",
            BlockKind::ToDo(ToDoContent {
                rich_text: vec![RichTextSpan::plain("ship")],
                checked: true,
            }),
        );
        assert_eq!(
            render(&block),
            "<div class=\"notion-to-do\"><input type=\"checkbox\" disabled=\"\" checked=\"\" />\
             <span class=\"notion-to-do-text notion-to-do-checked\">ship</span></div>"
        );
    }

    #[test]
    fn callout_with_emoji_icon_and_background() {
        let block = Block::new(
            "c",
            BlockKind::Callout(CalloutContent {
                rich_text: vec![RichTextSpan::plain("Note")],
                icon: Some(CalloutIcon::Emoji("💡".to_string())),
                color: Color::GrayBackground,
            }),
        );
        assert_eq!(
            render(&block),
            "<div class=\"notion-callout notion-bg-gray\"><span class=\"notion-callout-icon\" aria-hidden=\"true\">💡</span>\
             <div class=\"notion-callout-text\">Note</div></div>"
        );
    }

    #[test]
    fn raw_markup_drops_orphan_closing_divs() {
        let block = Block::new(
            "raw",
            BlockKind::RawMarkup(RawMarkupContent {
                html: "<div>ok</div></div>".to_string(),
            }),
        );
        assert_eq!(
            render(&block),
            "<div class=\"notion-raw-markup\"><div>ok</div></div>"
        );
    }

    #[test]
    fn unsupported_block_keeps_type_and_text() {
        let block = Block::new(
            "u",
            BlockKind::Unsupported(UnsupportedContent {
                raw_type: "synced_block".to_string(),
                rich_text: vec![RichTextSpan::plain("text")],
            }),
        );
        assert_eq!(
            render(&block),
            "<div class=\"notion-unsupported\" data-block-type=\"synced_block\">text</div>"
        );
    }

    #[test]
    fn nesting_beyond_limit_becomes_placeholder() {
        let deep = Block::new("leaf", BlockKind::Paragraph(text("deep")));
        let context = RenderContext::new(true, 1);
        let mut html = String::new();
        let toggle = Block::new("t1", BlockKind::Toggle(text("a"))).with_children(vec![
            Block::new("t2", BlockKind::Toggle(text("b"))).with_children(vec![deep]),
        ]);
        html.push_str(&render_block(&toggle, context));

        assert!(html.contains("<summary>b</summary>"), "{html}");
        assert!(
            html.contains("data-block-id=\"leaf\" data-block-type=\"paragraph\" data-error-kind=\"nesting\""),
            "{html}"
        );
    }

    #[test]
    fn failing_child_does_not_affect_siblings() {
        let toggle = Block::new("t", BlockKind::Toggle(text("x"))).with_children(vec![
            Block::new("bad", BlockKind::Embed(MediaContent::default())),
            Block::new("good", BlockKind::Paragraph(text("fine"))),
        ]);
        let html = render(&toggle);
        assert!(html.contains("data-error-kind=\"media\""), "{html}");
        assert!(html.contains("<p class=\"notion-paragraph\">fine</p>"), "{html}");
    }
}
