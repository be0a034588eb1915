use crate::app::ports::{FetchError, HttpClientPort, HttpGetResult, HttpHeadResult};
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::header::HeaderMap;
use std::time::Duration;

/// `reqwest`-backed client. Every request carries the configured timeout.
pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl ReqwestHttp {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
}

#[async_trait]
impl HttpClientPort for ReqwestHttp {
    async fn get(&self, url: &str) -> Result<HttpGetResult, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?
            .to_vec();
        Ok(HttpGetResult {
            status,
            bytes,
            content_type: content_type(&headers),
        })
    }

    async fn head(&self, url: &str) -> Result<HttpHeadResult, FetchError> {
        let resp = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;
        let headers = resp.headers();
        Ok(HttpHeadResult {
            status: resp.status().as_u16(),
            content_type: content_type(headers),
            content_length: content_length(headers),
        })
    }
}
