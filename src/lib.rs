//! feedmerge — merges remote feeds of heterogeneous formats (RSS 2.0,
//! Atom 1.0, JSON Feed 1.1) into a single deduplicated, date-descending
//! collection and republishes it in all three serializations.
//!
//! Pipeline: [`feed::fetch_source`] → [`feed::normalize`] (with media
//! heuristics from [`feed::media`]) → [`merge::refresh`] → [`render`].
//! The merged collection lives in a [`merge::CacheStore`] snapshot that is
//! replaced atomically on each refresh cycle; HTTP handlers in [`server`]
//! read whichever complete snapshot is current and never block on refresh.

pub mod config;
pub mod feed;
pub mod merge;
pub mod render;
pub mod scheduler;
pub mod server;
pub mod util;
