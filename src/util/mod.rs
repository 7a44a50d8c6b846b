//! Utility functions for common operations.
//!
//! - **Text processing**: HTML stripping and truncation for item summaries
//! - **URL validation**: startup validation of configured source URLs

mod text;
mod url_validator;

pub use text::{strip_html, truncate_chars};
pub use url_validator::{validate_source_url, UrlValidationError};
