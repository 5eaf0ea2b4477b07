use serde::{Deserialize, Serialize};

/// One run of inline text sharing the same annotations and link.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RichTextSpan {
    #[serde(rename = "plain_text", default)]
    pub text: String,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(rename = "href", default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: Color,
}

/// Text and background colors offered by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Gray,
    Brown,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    Red,
    GrayBackground,
    BrownBackground,
    OrangeBackground,
    YellowBackground,
    GreenBackground,
    BlueBackground,
    PurpleBackground,
    PinkBackground,
    RedBackground,
    #[default]
    #[serde(other)]
    Default,
}

impl Color {
    /// CSS class for the color, `None` for the default color.
    pub fn css_class(self) -> Option<String> {
        let (name, background) = match self {
            Color::Default => return None,
            Color::Gray => ("gray", false),
            Color::Brown => ("brown", false),
            Color::Orange => ("orange", false),
            Color::Yellow => ("yellow", false),
            Color::Green => ("green", false),
            Color::Blue => ("blue", false),
            Color::Purple => ("purple", false),
            Color::Pink => ("pink", false),
            Color::Red => ("red", false),
            Color::GrayBackground => ("gray", true),
            Color::BrownBackground => ("brown", true),
            Color::OrangeBackground => ("orange", true),
            Color::YellowBackground => ("yellow", true),
            Color::GreenBackground => ("green", true),
            Color::BlueBackground => ("blue", true),
            Color::PurpleBackground => ("purple", true),
            Color::PinkBackground => ("pink", true),
            Color::RedBackground => ("red", true),
        };

        Some(if background {
            format!("notion-bg-{name}")
        } else {
            format!("notion-color-{name}")
        })
    }
}

impl RichTextSpan {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.annotations.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.annotations.italic = true;
        self
    }

    pub fn strikethrough(mut self) -> Self {
        self.annotations.strikethrough = true;
        self
    }

    pub fn underline(mut self) -> Self {
        self.annotations.underline = true;
        self
    }

    pub fn code(mut self) -> Self {
        self.annotations.code = true;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.annotations.color = color;
        self
    }

    pub fn with_link(mut self, url: impl Into<String>) -> Self {
        self.link = Some(url.into());
        self
    }
}

/// Concatenated text of `spans` without any formatting.
pub fn plain_text(spans: &[RichTextSpan]) -> String {
    spans.iter().map(|span| span.text.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_service_payload() {
        let span: RichTextSpan = serde_json::from_value(serde_json::json!({
            "type": "text",
            "text": { "content": "docs", "link": { "url": "https://example.com" } },
            "annotations": {
                "bold": true,
                "italic": false,
                "strikethrough": false,
                "underline": false,
                "code": false,
                "color": "blue_background"
            },
            "plain_text": "docs",
            "href": "https://example.com"
        }))
        .expect("span should deserialize");

        assert_eq!(span.text, "docs");
        assert!(span.annotations.bold);
        assert_eq!(span.annotations.color, Color::BlueBackground);
        assert_eq!(span.link.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn unknown_colors_fall_back_to_default() {
        let annotations: Annotations =
            serde_json::from_value(serde_json::json!({ "color": "teal" })).expect("annotations");
        assert_eq!(annotations.color, Color::Default);
        assert_eq!(annotations.color.css_class(), None);
    }

    #[test]
    fn default_color_uses_service_name() {
        assert_eq!(
            serde_json::to_value(Color::Default).expect("color"),
            serde_json::json!("default")
        );
        let color: Color = serde_json::from_value(serde_json::json!("default")).expect("color");
        assert_eq!(color, Color::Default);
    }

    #[test]
    fn css_classes_distinguish_text_and_background() {
        assert_eq!(Color::Red.css_class().as_deref(), Some("notion-color-red"));
        assert_eq!(
            Color::RedBackground.css_class().as_deref(),
            Some("notion-bg-red")
        );
    }

    #[test]
    fn plain_text_joins_spans() {
        let spans = vec![RichTextSpan::plain("Hello, "), RichTextSpan::plain("world").bold()];
        assert_eq!(plain_text(&spans), "Hello, world");
    }
}
