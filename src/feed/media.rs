//! Best-effort media recovery from inconsistent feed metadata.
//!
//! Each extractor is an ordered slice of pure rules evaluated in sequence;
//! the first rule returning `Some` wins. Priority favors explicit,
//! structured signals (typed enclosures, media extensions) over content
//! scraping, which is kept as a last resort to bound false positives.
//! `None` is a normal outcome, not an error.

use super::normalize::MediaReference;
use super::source::RawItem;

const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".webm"];

/// Watch-page URL fragments that signal "follow the link to view".
const WATCH_PAGE_PATTERNS: &[&str] = &["youtube.com/watch", "youtu.be/", "vimeo.com/"];

type ImageRule = fn(&RawItem) -> Option<String>;
type VideoRule = fn(&RawItem) -> Option<MediaReference>;

const IMAGE_RULES: &[ImageRule] = &[
    image_from_enclosure,
    image_from_media_extension,
    image_from_content_scan,
    image_from_json_hint,
];

const VIDEO_RULES: &[VideoRule] = &[
    video_from_enclosure,
    video_from_media_text,
    video_from_watch_page_link,
    video_from_content_scan,
];

/// Recovers a representative image URL for an item, trying rules in strict
/// priority order: typed enclosure, media extension, content `<img>` scan,
/// JSON-feed image hint.
pub fn pick_image(raw: &RawItem) -> Option<String> {
    IMAGE_RULES.iter().find_map(|rule| rule(raw))
}

/// Recovers a video reference for an item, trying rules in strict priority
/// order: typed enclosure, media-block URL scan, watch-page link, content
/// URL scan. A watch-page match carries media type `text/html` to signal
/// "link to a player page", not a direct media file.
pub fn pick_video(raw: &RawItem) -> Option<MediaReference> {
    VIDEO_RULES.iter().find_map(|rule| rule(raw))
}

// ============================================================================
// Image rules
// ============================================================================

fn image_from_enclosure(raw: &RawItem) -> Option<String> {
    let enclosure = raw.enclosure.as_ref()?;
    enclosure
        .mime_type
        .starts_with("image/")
        .then(|| enclosure.url.clone())
}

fn image_from_media_extension(raw: &RawItem) -> Option<String> {
    if let Some(thumb) = raw.media_thumbnails.first() {
        return Some(thumb.clone());
    }
    // Untyped media contents are accepted here; explicitly non-image ones
    // (video/audio) are not images
    raw.media_contents
        .iter()
        .find(|m| m.mime_type.is_empty() || m.mime_type.starts_with("image/"))
        .map(|m| m.url.clone())
}

fn image_from_content_scan(raw: &RawItem) -> Option<String> {
    let html = raw.content.as_deref().or(raw.snippet.as_deref())?;
    find_img_src(html)
}

fn image_from_json_hint(raw: &RawItem) -> Option<String> {
    raw.image_hint.clone()
}

// ============================================================================
// Video rules
// ============================================================================

fn video_from_enclosure(raw: &RawItem) -> Option<MediaReference> {
    let enclosure = raw.enclosure.as_ref()?;
    enclosure
        .mime_type
        .starts_with("video/")
        .then(|| enclosure.clone())
}

fn video_from_media_text(raw: &RawItem) -> Option<MediaReference> {
    let text = raw.media_text.as_deref()?;
    find_video_url(text).map(direct_video_reference)
}

fn video_from_watch_page_link(raw: &RawItem) -> Option<MediaReference> {
    let link = raw.link.as_deref()?;
    WATCH_PAGE_PATTERNS
        .iter()
        .any(|pattern| link.contains(pattern))
        .then(|| MediaReference {
            url: link.to_string(),
            mime_type: "text/html".to_string(),
        })
}

fn video_from_content_scan(raw: &RawItem) -> Option<MediaReference> {
    let html = raw.content.as_deref().or(raw.snippet.as_deref())?;
    find_video_url(html).map(direct_video_reference)
}

fn direct_video_reference(url: String) -> MediaReference {
    let mime_type = if url_path(&url).ends_with(".webm") {
        "video/webm"
    } else {
        "video/mp4"
    };
    MediaReference {
        url,
        mime_type: mime_type.to_string(),
    }
}

// ============================================================================
// String scanning (no HTML parser dependency)
// ============================================================================

/// Scans HTML for the first `<img>` tag and extracts its `src` attribute.
/// Handles attribute ordering and quote-style variations.
fn find_img_src(html: &str) -> Option<String> {
    // ASCII-only lowering keeps byte offsets identical to the original, so
    // positions found in the lowered copy index safely into `html` even when
    // surrounding text contains multibyte characters
    let html_lower = html.to_ascii_lowercase();
    let mut search_from = 0;

    while let Some(tag_start) = html_lower[search_from..].find("<img") {
        let abs_start = search_from + tag_start;
        let remaining = &html_lower[abs_start..];

        let tag_end = remaining.find('>')?;

        // Extract src from the original (non-lowered) HTML to preserve URL case
        let original_tag = &html[abs_start..abs_start + tag_end + 1];
        if let Some(src) = extract_attr_value(original_tag, "src") {
            if !src.is_empty() {
                return Some(src.to_string());
            }
        }

        search_from = abs_start + tag_end + 1;
    }

    None
}

/// Extracts the value of an attribute from a tag string (case-preserving).
fn extract_attr_value<'a>(tag: &'a str, attr_name: &str) -> Option<&'a str> {
    // Same offset-preserving ASCII lowering as find_img_src
    let tag_lower = tag.to_ascii_lowercase();
    let attr_prefix = format!("{attr_name}=");

    let attr_start = tag_lower.find(&attr_prefix)?;
    let value_start = attr_start + attr_prefix.len();

    if value_start >= tag.len() {
        return None;
    }

    let rest = &tag[value_start..];
    let quote = rest.as_bytes().first()?;

    if *quote != b'"' && *quote != b'\'' {
        return None;
    }

    let quote_char = *quote as char;
    let inner = &rest[1..];
    let end = inner.find(quote_char)?;

    Some(&inner[..end])
}

/// Scans arbitrary text (HTML or a stringified media block) for the first
/// http(s) URL whose path ends in a direct-video extension.
fn find_video_url(text: &str) -> Option<String> {
    let mut search_from = 0;

    while let Some(pos) = text[search_from..].find("http") {
        let abs_start = search_from + pos;
        let candidate = &text[abs_start..];

        let end = candidate
            .find(|c: char| {
                c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>' | ')' | '\\')
            })
            .unwrap_or(candidate.len());
        let url = &candidate[..end];

        if (url.starts_with("http://") || url.starts_with("https://"))
            && VIDEO_EXTENSIONS
                .iter()
                .any(|ext| url_path(url).ends_with(ext))
        {
            return Some(url.to_string());
        }

        search_from = abs_start + end.max(4);
    }

    None
}

/// The URL up to any query string or fragment, for extension matching.
fn url_path(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_enclosure() -> MediaReference {
        MediaReference {
            url: "https://example.com/enclosed.png".to_string(),
            mime_type: "image/png".to_string(),
        }
    }

    fn video_enclosure() -> MediaReference {
        MediaReference {
            url: "https://example.com/enclosed.mp4".to_string(),
            mime_type: "video/mp4".to_string(),
        }
    }

    // --- pick_image priority ---

    #[test]
    fn test_image_enclosure_beats_content_scan() {
        let raw = RawItem {
            enclosure: Some(image_enclosure()),
            content: Some(r#"<p><img src="https://example.com/scraped.jpg"></p>"#.to_string()),
            ..RawItem::default()
        };
        assert_eq!(
            pick_image(&raw).as_deref(),
            Some("https://example.com/enclosed.png")
        );
    }

    #[test]
    fn test_non_image_enclosure_skipped() {
        let raw = RawItem {
            enclosure: Some(video_enclosure()),
            image_hint: Some("https://example.com/banner.jpg".to_string()),
            ..RawItem::default()
        };
        assert_eq!(
            pick_image(&raw).as_deref(),
            Some("https://example.com/banner.jpg")
        );
    }

    #[test]
    fn test_media_thumbnail_beats_content_scan() {
        let raw = RawItem {
            media_thumbnails: vec!["https://example.com/thumb.jpg".to_string()],
            content: Some(r#"<img src="https://example.com/scraped.jpg">"#.to_string()),
            ..RawItem::default()
        };
        assert_eq!(
            pick_image(&raw).as_deref(),
            Some("https://example.com/thumb.jpg")
        );
    }

    #[test]
    fn test_video_typed_media_content_is_not_an_image() {
        let raw = RawItem {
            media_contents: vec![MediaReference {
                url: "https://example.com/clip.mp4".to_string(),
                mime_type: "video/mp4".to_string(),
            }],
            ..RawItem::default()
        };
        assert!(pick_image(&raw).is_none());
    }

    #[test]
    fn test_image_scan_after_multibyte_text() {
        // Characters like 'İ' change byte length under full Unicode lowering;
        // the scanner must still find tags that follow them
        let raw = RawItem {
            content: Some(
                r#"İİİ kapak görseli <img src="https://example.com/kapak.png"> metin"#
                    .to_string(),
            ),
            ..RawItem::default()
        };
        assert_eq!(
            pick_image(&raw).as_deref(),
            Some("https://example.com/kapak.png")
        );
    }

    #[test]
    fn test_attr_extraction_after_multibyte_text() {
        let tag = r#"<img alt="görsel İÇERİK" src="https://example.com/a.png">"#;
        assert_eq!(
            extract_attr_value(tag, "src"),
            Some("https://example.com/a.png")
        );
    }

    #[test]
    fn test_image_scanned_from_content() {
        let raw = RawItem {
            content: Some(
                r#"<p>text</p><img alt="x" src="https://example.com/Inline.JPG"> more"#.to_string(),
            ),
            ..RawItem::default()
        };
        // URL case must be preserved
        assert_eq!(
            pick_image(&raw).as_deref(),
            Some("https://example.com/Inline.JPG")
        );
    }

    #[test]
    fn test_image_none_is_normal() {
        assert!(pick_image(&RawItem::default()).is_none());
    }

    // --- pick_video priority ---

    #[test]
    fn test_video_enclosure_beats_watch_link() {
        let raw = RawItem {
            enclosure: Some(video_enclosure()),
            link: Some("https://www.youtube.com/watch?v=abc123".to_string()),
            ..RawItem::default()
        };
        let video = pick_video(&raw).unwrap();
        assert_eq!(video.url, "https://example.com/enclosed.mp4");
        assert_eq!(video.mime_type, "video/mp4");
    }

    #[test]
    fn test_media_text_scan_finds_direct_video() {
        let raw = RawItem {
            media_text: Some(
                r#"[MediaObject { content: [MediaContent { url: Some(Url { "https://example.com/clip.webm" }) }] }]"#
                    .to_string(),
            ),
            ..RawItem::default()
        };
        let video = pick_video(&raw).unwrap();
        assert_eq!(video.url, "https://example.com/clip.webm");
        assert_eq!(video.mime_type, "video/webm");
    }

    #[test]
    fn test_watch_page_link_returns_text_html() {
        let raw = RawItem {
            link: Some("https://www.youtube.com/watch?v=abc123".to_string()),
            ..RawItem::default()
        };
        let video = pick_video(&raw).unwrap();
        assert_eq!(video.url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(video.mime_type, "text/html");
    }

    #[test]
    fn test_video_scanned_from_content() {
        let raw = RawItem {
            content: Some(
                r#"<p>clip: <a href="https://example.com/talk.mp4?t=30">here</a></p>"#.to_string(),
            ),
            ..RawItem::default()
        };
        let video = pick_video(&raw).unwrap();
        assert_eq!(video.url, "https://example.com/talk.mp4?t=30");
        assert_eq!(video.mime_type, "video/mp4");
    }

    #[test]
    fn test_plain_link_is_not_a_video() {
        let raw = RawItem {
            link: Some("https://example.com/post/1".to_string()),
            ..RawItem::default()
        };
        assert!(pick_video(&raw).is_none());
    }

    // --- scanners ---

    #[test]
    fn test_find_img_src_single_quotes() {
        assert_eq!(
            find_img_src("<img src='https://e.com/a.png'/>"),
            Some("https://e.com/a.png".to_string())
        );
    }

    #[test]
    fn test_find_img_src_skips_srcless_img() {
        assert_eq!(
            find_img_src(r#"<img alt="no src"><img src="https://e.com/b.png">"#),
            Some("https://e.com/b.png".to_string())
        );
    }

    #[test]
    fn test_find_video_url_ignores_non_video() {
        assert!(find_video_url("see https://example.com/page.html for more").is_none());
    }

    #[test]
    fn test_find_video_url_query_string() {
        assert_eq!(
            find_video_url("https://e.com/v.mp4?dl=1"),
            Some("https://e.com/v.mp4?dl=1".to_string())
        );
    }
}
