use crate::domain::rich_text::RichTextSpan;

/// Escape text for use in element content and double-quoted attribute values.
pub(crate) fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Render a run of annotated spans into inline markup.
///
/// Text is always escaped before any wrapping. With `apply_formatting = false` (code bodies)
/// annotations, links and line breaks are ignored.
pub fn render_spans(spans: &[RichTextSpan], apply_formatting: bool) -> String {
    spans
        .iter()
        .map(|span| {
            if apply_formatting {
                render_span(span)
            } else {
                escape_html(&span.text)
            }
        })
        .collect()
}

fn render_span(span: &RichTextSpan) -> String {
    let mut html = escape_html(&span.text).replace('\n', "<br />");
    let annotations = &span.annotations;

    if annotations.bold {
        html = format!("<strong>{html}</strong>");
    }
    if annotations.italic {
        html = format!("<em>{html}</em>");
    }
    if annotations.strikethrough {
        html = format!("<s>{html}</s>");
    }
    if annotations.underline {
        html = format!("<u>{html}</u>");
    }
    if annotations.code {
        html = format!("<code class=\"notion-inline-code\">{html}</code>");
    }
    if let Some(class) = annotations.color.css_class() {
        html = format!("<span class=\"{class}\">{html}</span>");
    }
    if let Some(link) = span.link.as_deref().filter(|link| !link.trim().is_empty()) {
        html = wrap_link(link, &html);
    }

    html
}

fn wrap_link(url: &str, inner: &str) -> String {
    let href = escape_html(url.trim());
    if is_relative(url) {
        format!("<a href=\"{href}\">{inner}</a>")
    } else {
        format!("<a href=\"{href}\" target=\"_blank\" rel=\"noopener noreferrer\">{inner}</a>")
    }
}

fn is_relative(url: &str) -> bool {
    let trimmed = url.trim_start();
    (trimmed.starts_with('/') && !trimmed.starts_with("//")) || trimmed.starts_with('#')
}
