//! Normalization of adapter output into the canonical item model.

use chrono::{DateTime, Utc};

use super::media;
use super::source::RawItem;

/// A discovered image or video: URL plus media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    pub url: String,
    pub mime_type: String,
}

/// Canonical feed item. `link` is the identity key: it is never empty, and
/// within a cache snapshot it is unique.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub title: String,
    pub link: String,
    pub date: DateTime<Utc>,
    /// HTML or plain text, whichever the source provided.
    pub description: String,
    /// Empty when the source named no author.
    pub author_name: String,
    pub image_url: Option<String>,
    pub video: Option<MediaReference>,
    pub enclosure: Option<MediaReference>,
    /// Locator of the source feed this item came from.
    pub source: String,
}

/// Maps a raw adapter record into the canonical [`Item`].
///
/// Returns `None` when no canonical link can be resolved — such items are
/// filtered out of the pipeline entirely, not treated as errors.
///
/// Pure apart from the missing-date fallback, which substitutes the current
/// time (tests must treat the date as time-dependent in that case).
pub fn normalize(raw: RawItem, source: &str) -> Option<Item> {
    let link = canonical_link(&raw)?;

    let date = raw.date.unwrap_or_else(Utc::now);

    // Full/encoded content wins over the short snippet
    let description = raw
        .content
        .clone()
        .or_else(|| raw.snippet.clone())
        .unwrap_or_default();

    let image_url = media::pick_image(&raw);
    let video = media::pick_video(&raw);

    Some(Item {
        title: raw.title.unwrap_or_else(|| "Untitled".to_string()),
        link,
        date,
        description,
        author_name: raw.author.unwrap_or_default(),
        image_url,
        video,
        enclosure: raw.enclosure,
        source: source.to_string(),
    })
}

/// Resolves the canonical link: the explicit link field, else a guid that is
/// itself a URL. feed-rs synthesizes ids for entries that carry none, so a
/// non-URL guid must not be allowed to stand in for a missing link.
fn canonical_link(raw: &RawItem) -> Option<String> {
    let explicit = raw
        .link
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());

    let guid_url = raw
        .guid
        .as_deref()
        .map(str::trim)
        .filter(|g| g.starts_with("http://") || g.starts_with("https://"));

    explicit.or(guid_url).map(str::to_owned)
}
