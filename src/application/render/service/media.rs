use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::blocks::{Block, BlockKind};

static YOUTUBE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:youtube(?:-nocookie)?\.com/(?:watch\?(?:[^#]*&)?v=|embed/|shorts/|live/)|youtu\.be/)([A-Za-z0-9_-]{11})",
    )
    .expect("youtube pattern must compile")
});

static VIMEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"vimeo\.com/(?:video/|channels/[^/]+/)?(\d+)").expect("vimeo pattern must compile")
});

/// Canonical embed URL for video hosts that must be framed rather than linked.
pub(crate) fn embed_url(url: &str) -> Option<String> {
    if let Some(captures) = YOUTUBE_ID.captures(url) {
        return Some(format!("https://www.youtube.com/embed/{}", &captures[1]));
    }
    if let Some(captures) = VIMEO_ID.captures(url) {
        return Some(format!("https://player.vimeo.com/video/{}", &captures[1]));
    }
    None
}

/// URL of the first image in document order, searching children depth-first.
pub fn first_image_url(blocks: &[Block]) -> Option<String> {
    blocks.iter().find_map(|block| match &block.kind {
        BlockKind::Image(media) => media
            .url()
            .map(str::to_string)
            .or_else(|| first_image_url(&block.children)),
        _ => first_image_url(&block.children),
    })
}
