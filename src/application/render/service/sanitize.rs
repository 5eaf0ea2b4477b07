use std::collections::{BTreeSet, HashMap, HashSet};

use ammonia::Builder as AmmoniaBuilder;
use lol_html::{RewriteStrSettings, element, rewrite_str};
use once_cell::sync::Lazy;
use tracing::warn;

use super::balance::balance_tags;

/// Elements that survive sanitization.
pub(crate) const ALLOWED_TAGS: &[&str] = &[
    "a",
    "b",
    "blockquote",
    "br",
    "code",
    "del",
    "details",
    "div",
    "em",
    "figcaption",
    "figure",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "hr",
    "i",
    "iframe",
    "img",
    "input",
    "kbd",
    "li",
    "mark",
    "ol",
    "p",
    "pre",
    "s",
    "source",
    "span",
    "strong",
    "sub",
    "summary",
    "sup",
    "table",
    "tbody",
    "td",
    "th",
    "thead",
    "tr",
    "u",
    "ul",
    "video",
];

/// Attributes allowed on every surviving element, besides `data-*`.
pub(crate) const GENERIC_ATTRIBUTES: &[&str] = &[
    "class",
    "id",
    "title",
    "lang",
    "dir",
    "aria-hidden",
    "aria-label",
    "role",
];

/// Per-element attributes. This replaces ammonia's defaults, so an element missing here
/// keeps only the generic attributes.
pub(crate) const TAG_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href", "target", "rel"]),
    ("img", &["src", "alt", "width", "height", "loading", "decoding"]),
    (
        "iframe",
        &[
            "src",
            "allow",
            "allowfullscreen",
            "loading",
            "referrerpolicy",
            "frameborder",
        ],
    ),
    ("video", &["src", "controls", "preload", "poster", "playsinline"]),
    ("source", &["src", "type"]),
    ("details", &["open"]),
    ("th", &["colspan", "rowspan", "scope"]),
    ("td", &["colspan", "rowspan"]),
    ("input", &["type", "checked", "disabled"]),
];

static SANITIZER: Lazy<AmmoniaBuilder<'static>> = Lazy::new(build_sanitizer);

/// Clean assembled document markup.
///
/// Runs the allow-list filter, marks links by kind (external links open in a new tab
/// without referrer), then repairs tag structure.
pub fn sanitize(html: &str) -> String {
    let cleaned = SANITIZER.clean(html).to_string();
    let annotated = match annotate_links(&cleaned) {
        Ok(annotated) => annotated,
        Err(err) => {
            warn!(
                target = "application::render::sanitize",
                error = %err,
                "link annotation failed; keeping filtered markup"
            );
            cleaned
        }
    };
    balance_tags(&annotated)
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = ALLOWED_TAGS.iter().copied().collect();
    builder.tags(tags);

    builder.generic_attributes(GENERIC_ATTRIBUTES.iter().copied().collect());
    builder.add_generic_attribute_prefixes(&["data-"]);

    let per_tag: HashMap<&'static str, HashSet<&'static str>> = TAG_ATTRIBUTES
        .iter()
        .map(|(tag, attributes)| (*tag, attributes.iter().copied().collect()))
        .collect();
    builder.tag_attributes(per_tag);
    builder.link_rel(None);

    builder.add_url_schemes(["http", "https", "mailto", "tel"].iter().copied());

    builder
}

enum LinkKind {
    External,
    Internal,
    Anchor,
    Other,
}

fn classify_link(href: &str) -> LinkKind {
    if href.starts_with('#') || href.is_empty() {
        return LinkKind::Anchor;
    }

    if is_external_http_url(href) {
        return LinkKind::External;
    }

    if href.starts_with('/') || href.starts_with("./") || href.starts_with("../") {
        return LinkKind::Internal;
    }

    LinkKind::Other
}

fn is_external_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://") || value.starts_with("//")
}

fn merge_rel(existing: Option<String>, required: &[&str]) -> String {
    let mut tokens: BTreeSet<String> = existing
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    for &token in required {
        tokens.insert(token.to_string());
    }
    tokens.into_iter().collect::<Vec<_>>().join(" ")
}

fn annotate_links(html: &str) -> Result<String, lol_html::errors::RewritingError> {
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("a[href]", |el| {
                let href = el.get_attribute("href").unwrap_or_default();
                match classify_link(&href) {
                    LinkKind::External => {
                        let rel = merge_rel(el.get_attribute("rel"), &["noopener", "noreferrer"]);
                        el.set_attribute("rel", &rel)?;
                        el.set_attribute("target", "_blank")?;
                        el.set_attribute("data-link-kind", "external")?;
                    }
                    LinkKind::Internal => el.set_attribute("data-link-kind", "internal")?,
                    LinkKind::Anchor => el.set_attribute("data-link-kind", "anchor")?,
                    LinkKind::Other => el.set_attribute("data-link-kind", "other")?,
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use once_cell::sync::Lazy;
    use regex::Regex;

    use super::*;

    static OPEN_TAG: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"<([a-zA-Z][a-zA-Z0-9-]*)").expect("open tag pattern"));

    fn tags_in(html: &str) -> Vec<String> {
        OPEN_TAG
            .captures_iter(html)
            .map(|captures| captures[1].to_ascii_lowercase())
            .collect()
    }

    #[test]
    fn strips_scripts_and_event_handlers() {
        let html = sanitize(
            "<p onclick=\"steal()\">hi</p><script>alert(1)</script><style>p{}</style>",
        );
        assert_eq!(html, "<p>hi</p>");
    }

    #[test]
    fn output_contains_only_allowed_tags() {
        let html = sanitize(
            "<div><form><input type=\"text\"></form><object data=\"x\"></object>\
             <marquee>m</marquee><table><tr><td>c</td></tr></table></div>",
        );
        for tag in tags_in(&html) {
            assert!(ALLOWED_TAGS.contains(&tag.as_str()), "unexpected <{tag}> in {html}");
        }
    }

    static ELEMENT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"<([a-zA-Z][a-zA-Z0-9-]*)((?:\s+[^\s=>/]+(?:="[^"]*")?)*)\s*/?>"#)
            .expect("element pattern")
    });
    static ATTRIBUTE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"([^\s=/]+)(?:="[^"]*")?"#).expect("attribute pattern"));

    fn attribute_allowed(tag: &str, attribute: &str) -> bool {
        GENERIC_ATTRIBUTES.contains(&attribute)
            || attribute.starts_with("data-")
            || TAG_ATTRIBUTES
                .iter()
                .any(|(allowed_tag, allowed)| *allowed_tag == tag && allowed.contains(&attribute))
    }

    #[test]
    fn attributes_outside_the_allow_list_are_dropped() {
        let html = sanitize(
            "<img src=\"https://x.test/a.png\" alt=\"a\" onerror=\"steal()\" align=\"left\">\
             <iframe src=\"https://www.youtube.com/embed/abc\" srcdoc=\"<script>x</script>\"></iframe>\
             <a href=\"/about\" style=\"color:red\" hreflang=\"en\">about</a>\
             <table><tbody><tr><td width=\"9\" colspan=\"2\" align=\"right\">c</td></tr></tbody></table>\
             <ol start=\"4\" class=\"notion-numbered-list\"><li>x</li></ol>",
        );

        for element in ELEMENT.captures_iter(&html) {
            let tag = element[1].to_ascii_lowercase();
            for attribute in ATTRIBUTE.captures_iter(&element[2]) {
                let name = attribute[1].to_ascii_lowercase();
                assert!(
                    attribute_allowed(&tag, &name),
                    "<{tag}> kept `{name}` in {html}"
                );
            }
        }
        for removed in ["onerror", "srcdoc", "style=", "width=", "align=", "start=", "hreflang"] {
            assert!(!html.contains(removed), "`{removed}` survived in {html}");
        }
        assert!(html.contains("src=\"https://x.test/a.png\""), "{html}");
        assert!(html.contains("colspan=\"2\""), "{html}");
        assert!(html.contains("class=\"notion-numbered-list\""), "{html}");
    }

    #[test]
    fn javascript_urls_are_removed() {
        let html = sanitize("<a href=\"javascript:alert(1)\">x</a>");
        assert!(!html.contains("javascript"), "{html}");

        let html = sanitize("<iframe src=\"javascript:alert(1)\"></iframe>");
        assert!(!html.contains("javascript"), "{html}");
    }

    #[test]
    fn external_links_get_target_and_rel() {
        let html = sanitize("<a href=\"https://example.com\" rel=\"nofollow\">x</a>");
        assert!(html.contains("target=\"_blank\""), "{html}");
        assert!(html.contains("rel=\"nofollow noopener noreferrer\""), "{html}");
        assert!(html.contains("data-link-kind=\"external\""), "{html}");
    }

    #[test]
    fn internal_links_stay_in_place() {
        let html = sanitize("<a href=\"/about\">about</a>");
        assert!(!html.contains("target="), "{html}");
        assert!(html.contains("data-link-kind=\"internal\""), "{html}");
    }

    #[test]
    fn embeds_and_block_data_attributes_survive() {
        let html = sanitize(
            "<figure class=\"notion-video\"><iframe src=\"https://www.youtube.com/embed/abc\" \
             allowfullscreen=\"\"></iframe></figure><div class=\"notion-error\" \
             data-block-id=\"b1\"></div>",
        );
        assert!(html.contains("<iframe src=\"https://www.youtube.com/embed/abc\""), "{html}");
        assert!(html.contains("data-block-id=\"b1\""), "{html}");
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let inputs = [
            "<p>Plain <strong>bold</strong> &amp; <em>em</em></p>",
            "<ul class=\"notion-bulleted-list\"><li>a<br />b</li></ul>",
            "<a href=\"https://example.com\" target=\"_blank\" rel=\"noopener noreferrer\">x</a>",
            "<div class=\"notion-to-do\"><input type=\"checkbox\" disabled checked /> done</div>",
            "<div><p>unclosed <span>bits</div><img src=\"https://x.test/a.png\" alt=\"a\">",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "not idempotent for {input}");
        }
    }
}
