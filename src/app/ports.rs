use async_trait::async_trait;
use thiserror::Error;

/// Failures while talking to remote pages and image hosts. These never leave
/// the image pipeline; they only decide whether a candidate is usable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("content type '{0}' is not an image")]
    NotAnImage(String),

    #[error("content type '{0}' is not an HTML page")]
    NotHtml(String),

    #[error("image is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("image is {size} bytes, expected more than {min}")]
    TooSmall { size: u64, min: u64 },

    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
}

#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpGetResult, FetchError>;
    async fn head(&self, url: &str) -> Result<HttpHeadResult, FetchError>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Pages without a content type are given the benefit of the doubt.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map_or(true, |ct| ct.to_ascii_lowercase().contains("html"))
    }
}

#[derive(Clone, Debug)]
pub struct HttpHeadResult {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

impl HttpHeadResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
