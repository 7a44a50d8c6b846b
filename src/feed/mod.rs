//! Feed ingestion: fetching, format interpretation, media recovery, and
//! normalization into the canonical item model.
//!
//! - [`source`] - Source Adapter: fetches a URL and interprets the body as a
//!   JSON Feed first, falling back to RSS/Atom XML via `feed-rs`
//! - [`media`] - ordered best-effort heuristics recovering image and video
//!   references from inconsistent source metadata
//! - [`normalize`] - maps adapter output into the canonical [`Item`]
//!
//! Raw adapter records ([`RawItem`]) exist only on the adapter → normalizer
//! handoff; everything downstream of [`normalize`] works with [`Item`].

pub mod media;
pub mod normalize;
pub mod source;

pub use normalize::{normalize, Item, MediaReference};
pub use source::{fetch_source, FetchError, RawFeed, RawItem};
