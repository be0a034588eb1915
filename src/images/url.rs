use reqwest::Url;

use crate::app::ports::FetchError;

/// Resolve a URL found in a page against the page URL. Handles absolute,
/// protocol-relative, root-relative and path-relative forms; anything that
/// does not end up as http(s) is rejected.
pub fn resolve_image_url(candidate: &str, page: &Url) -> Result<String, FetchError> {
    let resolved = page
        .join(candidate.trim())
        .map_err(|_| FetchError::InvalidUrl(candidate.to_string()))?;
    match resolved.scheme() {
        "http" | "https" => Ok(resolved.to_string()),
        _ => Err(FetchError::InvalidUrl(candidate.to_string())),
    }
}

pub fn parse_page_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw.trim()).map_err(|_| FetchError::InvalidUrl(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(FetchError::InvalidUrl(raw.to_string())),
    }
}
