use thiserror::Error;
use url::Url;

/// Errors that can occur when validating a configured source URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
}

/// Validates a URL string for use as a feed source.
///
/// Sources come from deployment-time configuration, not user input, so this
/// only guards against operator typos: the URL must parse and must use an
/// http(s) scheme. Invalid entries are skipped at startup with a warning
/// rather than failing the process.
pub fn validate_source_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}
