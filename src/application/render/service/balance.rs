//! Structural tag repair.
//!
//! Not an HTML parser: tags are tokenized with a regular expression and matched against a
//! stack of open elements. Close tags that do not match the innermost open element are
//! dropped, and a fixed set of block containers left open at the end are closed.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

const SOURCE: &str = "application::render::balance";

static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(/?)([A-Za-z][A-Za-z0-9-]*)((?:"[^"]*"|'[^']*'|[^'">])*)>"#)
        .expect("tag pattern must compile")
});

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements closed automatically when still open at the end of the document.
const AUTO_CLOSE_TAGS: &[&str] = &["div", "figure", "table", "ul", "ol"];

pub fn balance_tags(html: &str) -> String {
    let mut output = String::with_capacity(html.len());
    let mut open: Vec<String> = Vec::new();
    let mut cursor = 0;

    for captures in TAG_PATTERN.captures_iter(html) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        output.push_str(&html[cursor..whole.start()]);
        cursor = whole.end();

        let is_close = captures.get(1).is_some_and(|slash| !slash.as_str().is_empty());
        let name = captures
            .get(2)
            .map(|name| name.as_str().to_ascii_lowercase())
            .unwrap_or_default();
        let attributes = captures.get(3).map_or("", |attrs| attrs.as_str());

        if is_close {
            if open.last() == Some(&name) {
                open.pop();
                output.push_str(whole.as_str());
            } else {
                warn!(
                    target = SOURCE,
                    tag = %name,
                    expected = open.last().map(String::as_str).unwrap_or("<none>"),
                    offset = whole.start(),
                    "dropping mismatched closing tag"
                );
            }
            continue;
        }

        output.push_str(whole.as_str());
        let self_closing = attributes.trim_end().ends_with('/');
        if !self_closing && !VOID_TAGS.contains(&name.as_str()) {
            open.push(name);
        }
    }
    output.push_str(&html[cursor..]);

    while let Some(name) = open.pop() {
        if AUTO_CLOSE_TAGS.contains(&name.as_str()) {
            output.push_str("</");
            output.push_str(&name);
            output.push('>');
        } else {
            warn!(
                target = SOURCE,
                tag = %name,
                "element left open at end of document"
            );
        }
    }

    output
}

/// Delete closing tags of `tag` that have no matching opening tag, starting from the end.
pub fn remove_surplus_closing_tags(html: &str, tag: &str) -> String {
    let escaped = regex::escape(tag);
    let (Ok(opening), Ok(closing)) = (
        Regex::new(&format!(r"(?i)<{escaped}(?:\s[^>]*)?/?>")),
        Regex::new(&format!(r"(?i)</{escaped}\s*>")),
    ) else {
        return html.to_string();
    };

    let opens = opening.find_iter(html).count();
    let closes: Vec<_> = closing.find_iter(html).collect();
    if closes.len() <= opens {
        return html.to_string();
    }

    let surplus = closes.len() - opens;
    warn!(
        target = SOURCE,
        tag,
        surplus,
        "removing orphaned closing tags"
    );

    let mut output = html.to_string();
    for found in closes.iter().rev().take(surplus) {
        output.replace_range(found.range(), "");
    }
    output
}
