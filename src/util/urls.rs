use thiserror::Error;
use url::Url;

/// Errors from checking a URL before handing it to the system opener.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
}

/// Extract the numeric id from an API resource URL.
///
/// The id is the last non-empty path segment, so a trailing slash is
/// tolerated. Returns `None` when the URL does not parse or the segment is
/// not an integer.
///
/// ```
/// use dexview::util::id_from_resource_url;
///
/// assert_eq!(id_from_resource_url("https://pokeapi.co/api/v2/pokemon/25/"), Some(25));
/// assert_eq!(id_from_resource_url("https://pokeapi.co/api/v2/pokemon/"), None);
/// ```
pub fn id_from_resource_url(resource_url: &str) -> Option<i64> {
    let url = Url::parse(resource_url).ok()?;
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .next_back()?
        .parse()
        .ok()
}

/// Validate a URL before passing it to `open::that`.
///
/// Only http(s) URLs are opened; anything else could launch a local handler.
pub fn validate_url_for_open(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}
