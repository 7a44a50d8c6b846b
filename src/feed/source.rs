//! Source Adapter: fetches a feed URL and interprets the body.
//!
//! Interpretation order follows the declared content type: responses that
//! advertise a JSON media type are tried as JSON Feed 1.1 first, and fall
//! through to the RSS/Atom XML grammar on the same bytes when the body is
//! not JSON or lacks a top-level `items` array. Responses without a JSON
//! content type go straight to the XML path.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use super::normalize::MediaReference;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching and interpreting one source.
///
/// All of these are non-fatal to a refresh cycle: the failing source simply
/// contributes zero items and the failure is logged by the caller.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the 30-second timeout
    #[error("Request timed out")]
    Timeout,
    /// Body could not be parsed as JSON Feed or RSS/Atom
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
}

/// Adapter output: the source's own title plus its items in document order.
#[derive(Debug, Default)]
pub struct RawFeed {
    pub title: String,
    pub items: Vec<RawItem>,
}

/// Unstructured bag of per-item fields as the origin format provided them.
/// Exists only on the adapter → normalizer handoff and is discarded after
/// normalization.
#[derive(Debug, Default, Clone)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub guid: Option<String>,
    pub date: Option<DateTime<Utc>>,
    /// Full/encoded content (`content:encoded`, Atom content, `content_html`).
    pub content: Option<String>,
    /// Short snippet (`description`, `summary`).
    pub snippet: Option<String>,
    pub author: Option<String>,
    /// Declared media attachment, when the format carried one.
    pub enclosure: Option<MediaReference>,
    /// `media:thumbnail` URLs in document order.
    pub media_thumbnails: Vec<String>,
    /// `media:content` / `media:group` entries in document order.
    pub media_contents: Vec<MediaReference>,
    /// Stringified media extension block, for last-resort URL scanning.
    pub media_text: Option<String>,
    /// JSON Feed `image` / `banner_image` hint.
    pub image_hint: Option<String>,
}

/// Fetches one source and interprets its body as a feed.
///
/// One request per call, with a 30-second timeout and a streamed 10MB body
/// cap. Any failure is returned as a value; nothing here aborts sibling
/// sources of the same refresh cycle.
pub async fn fetch_source(client: &reqwest::Client, url: &str) -> Result<RawFeed, FetchError> {
    let response = tokio::time::timeout(FETCH_TIMEOUT, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();

    let bytes = read_limited_bytes(response).await?;

    // JSON content type → try JSON Feed, fall through to XML when the body
    // is not actually a JSON Feed document
    if content_type.contains("json") {
        if let Some(feed) = parse_json_feed(&bytes) {
            return Ok(feed);
        }
        tracing::debug!(url = %url, "JSON content type without a JSON Feed body, trying XML");
    }

    parse_xml_feed(&bytes)
}

/// Reads a response body with a hard size limit using stream-based reading.
async fn read_limited_bytes(response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > MAX_FEED_SIZE {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > MAX_FEED_SIZE {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

// ============================================================================
// JSON Feed 1.1 interpretation
// ============================================================================

#[derive(Deserialize)]
struct JsonFeedDoc {
    title: Option<String>,
    items: Option<Vec<JsonFeedEntry>>,
}

#[derive(Deserialize)]
struct JsonFeedEntry {
    id: Option<String>,
    url: Option<String>,
    external_url: Option<String>,
    title: Option<String>,
    content_html: Option<String>,
    content_text: Option<String>,
    summary: Option<String>,
    date_published: Option<String>,
    date_modified: Option<String>,
    image: Option<String>,
    banner_image: Option<String>,
    author: Option<JsonFeedAuthor>,
    authors: Option<Vec<JsonFeedAuthor>>,
    attachments: Option<Vec<JsonFeedAttachment>>,
}

#[derive(Deserialize)]
struct JsonFeedAuthor {
    name: Option<String>,
    url: Option<String>,
}

#[derive(Deserialize)]
struct JsonFeedAttachment {
    url: Option<String>,
    mime_type: Option<String>,
}

/// Attempts JSON Feed interpretation of a body.
///
/// `None` means "not a JSON Feed" (invalid JSON, or no top-level `items`
/// array) and the caller falls through to the XML path — this is expected
/// flow, not an error.
fn parse_json_feed(bytes: &[u8]) -> Option<RawFeed> {
    let doc: JsonFeedDoc = serde_json::from_slice(bytes).ok()?;
    let entries = doc.items?;

    let items = entries.into_iter().map(json_entry_to_raw).collect();

    Some(RawFeed {
        title: doc.title.unwrap_or_default(),
        items,
    })
}

fn json_entry_to_raw(entry: JsonFeedEntry) -> RawItem {
    let date = entry
        .date_published
        .as_deref()
        .or(entry.date_modified.as_deref())
        .and_then(parse_date);

    let enclosure = entry.attachments.as_ref().and_then(|a| {
        let first = a.first()?;
        Some(MediaReference {
            url: first.url.clone()?,
            mime_type: first.mime_type.clone().unwrap_or_default(),
        })
    });

    // Attachments double as the scannable media block on the JSON side
    let media_text = entry
        .attachments
        .as_ref()
        .filter(|a| !a.is_empty())
        .map(|a| {
            a.iter()
                .filter_map(|att| att.url.as_deref())
                .collect::<Vec<_>>()
                .join(" ")
        });

    let author = entry
        .author
        .as_ref()
        .and_then(|a| a.name.clone().or_else(|| a.url.clone()))
        .or_else(|| {
            entry
                .authors
                .as_ref()
                .and_then(|list| list.first())
                .and_then(|a| a.name.clone().or_else(|| a.url.clone()))
        });

    RawItem {
        title: entry.title,
        link: entry.url.or(entry.external_url),
        guid: entry.id,
        date,
        content: entry.content_html.or(entry.content_text),
        snippet: entry.summary,
        author,
        enclosure,
        media_thumbnails: Vec::new(),
        media_contents: Vec::new(),
        media_text,
        image_hint: entry.image.or(entry.banner_image),
    }
}

/// Parses a date string as RFC 3339 (the JSON Feed format), falling back to
/// RFC 2822 for feeds that reuse RSS-style dates, then to a bare date.
fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ============================================================================
// RSS/Atom interpretation
// ============================================================================

/// Parses a body as RSS or Atom XML via feed-rs.
fn parse_xml_feed(bytes: &[u8]) -> Result<RawFeed, FetchError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

    let title = feed.title.map(|t| t.content).unwrap_or_default();
    let items = feed.entries.into_iter().map(xml_entry_to_raw).collect();

    Ok(RawFeed { title, items })
}

fn xml_entry_to_raw(entry: feed_rs::model::Entry) -> RawItem {
    let link = entry.links.first().map(|l| l.href.clone());

    // feed-rs leaves entry.id empty only for pathological input; it otherwise
    // carries the guid or a synthesized id (the normalizer decides whether it
    // can stand in for a link)
    let guid = if entry.id.trim().is_empty() {
        None
    } else {
        Some(entry.id.clone())
    };

    let date = entry.published.or(entry.updated);

    let content = entry.content.and_then(|c| c.body);
    let snippet = entry.summary.map(|s| s.content);

    let author = entry
        .authors
        .iter()
        .map(|p| p.name.trim())
        .find(|n| !n.is_empty())
        .map(str::to_owned);

    // feed-rs folds enclosure, media:content, media:thumbnail and media:group
    // into entry.media; the first typed content entry is treated as the
    // declared enclosure, everything is kept for the heuristics
    let media_text = if entry.media.is_empty() {
        None
    } else {
        Some(format!("{:?}", entry.media))
    };

    let mut enclosure = None;
    let mut media_thumbnails = Vec::new();
    let mut media_contents = Vec::new();
    for object in &entry.media {
        for thumb in &object.thumbnails {
            media_thumbnails.push(thumb.image.uri.clone());
        }
        for media_content in &object.content {
            let Some(url) = media_content.url.as_ref() else {
                continue;
            };
            let mime = media_content
                .content_type
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_default();
            if enclosure.is_none() && !mime.is_empty() {
                enclosure = Some(MediaReference {
                    url: url.to_string(),
                    mime_type: mime.clone(),
                });
            }
            media_contents.push(MediaReference {
                url: url.to_string(),
                mime_type: mime,
            });
        }
    }

    // Atom spells enclosures as links with rel="enclosure"
    if enclosure.is_none() {
        enclosure = entry
            .links
            .iter()
            .find(|l| l.rel.as_deref() == Some("enclosure"))
            .map(|l| MediaReference {
                url: l.href.clone(),
                mime_type: l.media_type.clone().unwrap_or_default(),
            });
    }

    RawItem {
        title: entry.title.map(|t| t.content),
        link,
        guid,
        date,
        content,
        snippet,
        author,
        enclosure,
        media_thumbnails,
        media_contents,
        media_text,
        image_hint: None,
    }
}
