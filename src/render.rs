//! Feed Renderer: serializes a cache snapshot as RSS 2.0, Atom 1.0, and
//! JSON Feed 1.1.
//!
//! All three renderers are pure functions of the snapshot they are handed
//! and are re-run per request. They are total over any well-formed cache:
//! an empty cache and items with every optional field absent both produce
//! complete, valid documents.

use chrono::SecondsFormat;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use std::fmt::Write as _;
use std::io;
use thiserror::Error;

use crate::feed::{Item, MediaReference};
use crate::merge::Cache;
use crate::util::{strip_html, truncate_chars};

/// Character limit for the short summary/description field.
const SUMMARY_LENGTH: usize = 300;

/// Metadata describing the merged output feed (from configuration).
#[derive(Debug, Clone)]
pub struct FeedMeta {
    pub title: String,
    pub site_url: String,
    pub description: String,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Rendered document is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

// ============================================================================
// Per-item building blocks shared by all three serializations
// ============================================================================

/// Builds the synthesized HTML content body for an item: image block, video
/// block, original description, trailing source attribution.
fn item_content_html(item: &Item) -> String {
    let mut html = String::new();

    if let Some(image) = &item.image_url {
        let _ = write!(html, r#"<p><img src="{}" /></p>"#, escape_html(image));
    }

    if let Some(video) = &item.video {
        if video.mime_type.starts_with("video/") {
            // Direct media file: embedded player
            let _ = write!(
                html,
                r#"<p><video controls src="{}"></video></p>"#,
                escape_html(&video.url)
            );
        } else {
            // Watch-page reference: plain link labeled for viewing
            let _ = write!(
                html,
                r#"<p><a href="{}">Watch video</a></p>"#,
                escape_html(&video.url)
            );
        }
    }

    html.push_str(&item.description);

    let _ = write!(
        html,
        "<p><em>Source: {}</em></p>",
        escape_html(&item.source)
    );

    html
}

/// Short plain-text summary, independent of the full content body.
fn item_summary(item: &Item) -> String {
    truncate_chars(&strip_html(&item.description), SUMMARY_LENGTH).into_owned()
}

/// Exactly one primary enclosure per item: the video reference, else the
/// original enclosure, else the image with a generic image type.
fn primary_enclosure(item: &Item) -> Option<MediaReference> {
    item.video
        .clone()
        .or_else(|| item.enclosure.clone())
        .or_else(|| {
            item.image_url.as_ref().map(|url| MediaReference {
                url: url.clone(),
                mime_type: "image/jpeg".to_string(),
            })
        })
}

/// Minimal HTML attribute/text escaping for values we interpolate into the
/// synthesized content body. Item descriptions are passed through as-is —
/// they are already HTML.
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ============================================================================
// RSS 2.0
// ============================================================================

/// Renders the cache as an RSS 2.0 document with `content:encoded` bodies
/// and `dc:creator` authors.
pub fn rss(meta: &FeedMeta, cache: &Cache) -> Result<String, RenderError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut rss_el = BytesStart::new("rss");
    rss_el.push_attribute(("version", "2.0"));
    rss_el.push_attribute(("xmlns:content", "http://purl.org/rss/1.0/modules/content/"));
    rss_el.push_attribute(("xmlns:dc", "http://purl.org/dc/elements/1.1/"));
    writer.write_event(Event::Start(rss_el))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    text_element(&mut writer, "title", &meta.title)?;
    text_element(&mut writer, "link", &meta.site_url)?;
    text_element(&mut writer, "description", &meta.description)?;
    text_element(&mut writer, "lastBuildDate", &cache.last_build.to_rfc2822())?;
    text_element(
        &mut writer,
        "generator",
        concat!("feedmerge ", env!("CARGO_PKG_VERSION")),
    )?;

    for item in &cache.items {
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        text_element(&mut writer, "title", &item.title)?;
        text_element(&mut writer, "link", &item.link)?;
        text_element(&mut writer, "guid", &item.link)?;
        text_element(&mut writer, "pubDate", &item.date.to_rfc2822())?;
        if !item.author_name.is_empty() {
            text_element(&mut writer, "dc:creator", &item.author_name)?;
        }
        text_element(&mut writer, "description", &item_summary(item))?;

        writer.write_event(Event::Start(BytesStart::new("content:encoded")))?;
        writer.write_event(Event::CData(BytesCData::new(cdata_safe(
            &item_content_html(item),
        ))))?;
        writer.write_event(Event::End(BytesEnd::new("content:encoded")))?;

        if let Some(enclosure) = primary_enclosure(item) {
            empty_element(
                &mut writer,
                "enclosure",
                &[
                    ("url", enclosure.url.as_str()),
                    ("type", enclosure.mime_type.as_str()),
                    ("length", "0"),
                ],
            )?;
        }
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    Ok(String::from_utf8(writer.into_inner())?)
}

// ============================================================================
// Atom 1.0
// ============================================================================

/// Renders the cache as an Atom 1.0 document.
pub fn atom(meta: &FeedMeta, cache: &Cache) -> Result<String, RenderError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut feed_el = BytesStart::new("feed");
    feed_el.push_attribute(("xmlns", "http://www.w3.org/2005/Atom"));
    writer.write_event(Event::Start(feed_el))?;

    text_element(&mut writer, "title", &meta.title)?;
    text_element(&mut writer, "id", &meta.site_url)?;
    text_element(&mut writer, "subtitle", &meta.description)?;
    text_element(&mut writer, "updated", &rfc3339(&cache.last_build))?;
    // RFC 4287 requires an author on the feed or on every entry; entries
    // from author-less sources inherit this one
    writer.write_event(Event::Start(BytesStart::new("author")))?;
    text_element(&mut writer, "name", &meta.title)?;
    writer.write_event(Event::End(BytesEnd::new("author")))?;
    empty_element(
        &mut writer,
        "link",
        &[("rel", "alternate"), ("href", meta.site_url.as_str())],
    )?;

    for item in &cache.items {
        writer.write_event(Event::Start(BytesStart::new("entry")))?;
        text_element(&mut writer, "title", &item.title)?;
        text_element(&mut writer, "id", &item.link)?;
        text_element(&mut writer, "updated", &rfc3339(&item.date))?;
        empty_element(
            &mut writer,
            "link",
            &[("rel", "alternate"), ("href", item.link.as_str())],
        )?;
        if !item.author_name.is_empty() {
            writer.write_event(Event::Start(BytesStart::new("author")))?;
            text_element(&mut writer, "name", &item.author_name)?;
            writer.write_event(Event::End(BytesEnd::new("author")))?;
        }
        text_element(&mut writer, "summary", &item_summary(item))?;

        let mut content_el = BytesStart::new("content");
        content_el.push_attribute(("type", "html"));
        writer.write_event(Event::Start(content_el))?;
        writer.write_event(Event::Text(BytesText::new(&item_content_html(item))))?;
        writer.write_event(Event::End(BytesEnd::new("content")))?;

        if let Some(enclosure) = primary_enclosure(item) {
            empty_element(
                &mut writer,
                "link",
                &[
                    ("rel", "enclosure"),
                    ("type", enclosure.mime_type.as_str()),
                    ("href", enclosure.url.as_str()),
                ],
            )?;
        }
        writer.write_event(Event::End(BytesEnd::new("entry")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("feed")))?;

    Ok(String::from_utf8(writer.into_inner())?)
}

// ============================================================================
// JSON Feed 1.1
// ============================================================================

#[derive(Serialize)]
struct JsonFeedDoc<'a> {
    version: &'static str,
    title: &'a str,
    home_page_url: &'a str,
    description: &'a str,
    items: Vec<JsonFeedItem>,
}

#[derive(Serialize)]
struct JsonFeedItem {
    id: String,
    url: String,
    title: String,
    content_html: String,
    summary: String,
    date_published: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    authors: Option<Vec<JsonFeedAuthor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachments: Option<Vec<JsonFeedAttachment>>,
}

#[derive(Serialize)]
struct JsonFeedAuthor {
    name: String,
}

#[derive(Serialize)]
struct JsonFeedAttachment {
    url: String,
    mime_type: String,
}

/// Renders the cache as a JSON Feed 1.1 document.
pub fn json(meta: &FeedMeta, cache: &Cache) -> Result<String, RenderError> {
    let items = cache
        .items
        .iter()
        .map(|item| {
            let authors = (!item.author_name.is_empty()).then(|| {
                vec![JsonFeedAuthor {
                    name: item.author_name.clone(),
                }]
            });
            let attachments = primary_enclosure(item).map(|enclosure| {
                vec![JsonFeedAttachment {
                    url: enclosure.url,
                    mime_type: enclosure.mime_type,
                }]
            });
            JsonFeedItem {
                id: item.link.clone(),
                url: item.link.clone(),
                title: item.title.clone(),
                content_html: item_content_html(item),
                summary: item_summary(item),
                date_published: rfc3339(&item.date),
                authors,
                image: item.image_url.clone(),
                attachments,
            }
        })
        .collect();

    let doc = JsonFeedDoc {
        version: "https://jsonfeed.org/version/1.1",
        title: &meta.title,
        home_page_url: &meta.site_url,
        description: &meta.description,
        items,
    };

    Ok(serde_json::to_string_pretty(&doc)?)
}

// ============================================================================
// Helpers
// ============================================================================

fn text_element<W: io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> Result<(), RenderError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn empty_element<W: io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    attributes: &[(&str, &str)],
) -> Result<(), RenderError> {
    let mut element = BytesStart::new(name);
    for attribute in attributes {
        element.push_attribute(*attribute);
    }
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

fn rfc3339(date: &chrono::DateTime<chrono::Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A CDATA section cannot contain its own terminator; split it the standard
/// way when feed content happens to include one.
fn cdata_safe(content: &str) -> String {
    content.replace("]]>", "]]]]><![CDATA[>")
}
