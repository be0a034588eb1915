use tracing::debug;

use super::ImageSettings;
use crate::app::ports::{FetchError, HttpClientPort};

/// HEAD-check an absolute image URL. Accepts a 2xx response with an `image/*`
/// content type no larger than the configured maximum; a missing
/// `Content-Length` counts as zero bytes. `min_bytes`, when set, must be
/// strictly exceeded. Returns the reported size.
pub async fn validate_image(
    http: &dyn HttpClientPort,
    url: &str,
    settings: &ImageSettings,
    min_bytes: Option<u64>,
) -> Result<u64, FetchError> {
    let head = http.head(url).await?;
    if !head.is_success() {
        return Err(FetchError::Status(head.status));
    }

    let content_type = head.content_type.unwrap_or_default();
    if !content_type.trim().to_ascii_lowercase().starts_with("image/") {
        return Err(FetchError::NotAnImage(content_type));
    }

    let size = head.content_length.unwrap_or(0);
    if size > settings.max_image_bytes {
        return Err(FetchError::TooLarge {
            size,
            limit: settings.max_image_bytes,
        });
    }
    if let Some(min) = min_bytes {
        if size <= min {
            return Err(FetchError::TooSmall { size, min });
        }
    }

    debug!("Validated image {} ({} bytes, {})", url, size, content_type);
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubHttp;

    const URL: &str = "https://cdn.example.com/hero.jpg";

    async fn check(http: StubHttp, min: Option<u64>) -> Result<u64, FetchError> {
        validate_image(&http, URL, &ImageSettings::default(), min).await
    }

    #[tokio::test]
    async fn accepts_a_reachable_image() {
        let http = StubHttp::new().with_image(URL, "image/jpeg", 240_000);
        assert_eq!(check(http, None).await, Ok(240_000));
    }

    #[tokio::test]
    async fn rejects_non_success_status() {
        let http = StubHttp::new().with_head(URL, 404, Some("text/html"), None);
        assert_eq!(check(http, None).await, Err(FetchError::Status(404)));
    }

    #[tokio::test]
    async fn rejects_non_image_content() {
        let http = StubHttp::new().with_head(URL, 200, Some("text/html; charset=utf-8"), Some(10));
        assert!(matches!(check(http, None).await, Err(FetchError::NotAnImage(_))));

        let http = StubHttp::new().with_head(URL, 200, None, Some(10));
        assert!(matches!(check(http, None).await, Err(FetchError::NotAnImage(_))));
    }

    #[tokio::test]
    async fn size_limits() {
        let max = ImageSettings::default().max_image_bytes;
        let http = StubHttp::new().with_image(URL, "image/png", max);
        assert_eq!(check(http, None).await, Ok(max));

        let http = StubHttp::new().with_image(URL, "image/png", max + 1);
        assert!(matches!(check(http, None).await, Err(FetchError::TooLarge { .. })));

        let http = StubHttp::new().with_image(URL, "image/png", 50_000);
        assert!(matches!(
            check(http, Some(50_000)).await,
            Err(FetchError::TooSmall { .. })
        ));

        // No Content-Length: passes the maximum, never beats a minimum
        let http = StubHttp::new().with_head(URL, 200, Some("image/webp"), None);
        assert_eq!(check(http, None).await, Ok(0));
        let http = StubHttp::new().with_head(URL, 200, Some("image/webp"), None);
        assert!(check(http, Some(50_000)).await.is_err());
    }

    #[tokio::test]
    async fn unreachable_host_is_an_http_error() {
        assert!(matches!(
            check(StubHttp::new(), None).await,
            Err(FetchError::Http(_))
        ));
    }
}
