//! Cover image resolution.
//!
//! A source page is scraped for candidate images (Open Graph, Twitter Card,
//! schema.org, then the first few inline images). The first candidate that
//! passes a HEAD check wins. Otherwise a stock image is picked by country,
//! then by event type. Network failures are never surfaced: they only turn
//! into a fallback.

pub mod backfill;
pub mod extract;
pub mod fallback;
pub mod url;
pub mod validate;

pub use backfill::{backfill_images, BackfillReport};
pub use extract::{CandidateKind, HtmlImageExtractor, ImageCandidate, ImageExtractor, RegexImageExtractor};
pub use fallback::FallbackImages;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::app::ports::{FetchError, HttpClientPort};
use crate::constants::{
    DEFAULT_MAX_IMAGE_BYTES, DEFAULT_MAX_INLINE_IMAGES, DEFAULT_MIN_INLINE_IMAGE_BYTES,
};
use crate::domain::EventType;
use crate::metrics::ImageMetrics;

/// Size thresholds for candidate validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSettings {
    /// Inline `<img>` candidates must be strictly larger than this
    pub min_inline_bytes: u64,
    pub max_image_bytes: u64,
    pub max_inline_images: usize,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            min_inline_bytes: DEFAULT_MIN_INLINE_IMAGE_BYTES,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_inline_images: DEFAULT_MAX_INLINE_IMAGES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedImage {
    pub cover_image: String,
    pub images: Vec<String>,
    pub has_original_image: bool,
}

impl ResolvedImage {
    fn single(url: String, has_original_image: bool) -> Self {
        Self {
            images: vec![url.clone()],
            cover_image: url,
            has_original_image,
        }
    }
}

pub struct ImageResolver {
    http: Arc<dyn HttpClientPort>,
    extractor: Arc<dyn ImageExtractor>,
    fallback: Arc<FallbackImages>,
    settings: ImageSettings,
}

impl ImageResolver {
    pub fn new(
        http: Arc<dyn HttpClientPort>,
        fallback: FallbackImages,
        settings: ImageSettings,
    ) -> Self {
        Self {
            http,
            extractor: Arc::new(HtmlImageExtractor::new(settings.max_inline_images)),
            fallback: Arc::new(fallback),
            settings,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ImageExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn fallback(&self) -> &FallbackImages {
        &self.fallback
    }

    /// Always returns a usable image. `has_original_image` is set only when
    /// the image came from the source page.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        source_url: Option<&str>,
        event_type: EventType,
        country: Option<&str>,
    ) -> ResolvedImage {
        if let Some(source_url) = source_url.filter(|u| !u.trim().is_empty()) {
            if let Some(url) = self.scrape(source_url).await {
                info!("Using original image {} from {}", url, source_url);
                ImageMetrics::record_original();
                return ResolvedImage::single(url, true);
            }
        }

        let url = self.fallback.select(event_type, country).to_string();
        debug!("Using stock image {} for {} in {:?}", url, event_type, country);
        ImageMetrics::record_fallback();
        ResolvedImage::single(url, false)
    }

    /// First validated candidate from the source page, if any.
    pub async fn scrape(&self, source_url: &str) -> Option<String> {
        match self.try_scrape(source_url).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Image scrape failed for {}: {}", source_url, e);
                None
            }
        }
    }

    async fn try_scrape(&self, source_url: &str) -> Result<Option<String>, FetchError> {
        let page_url = url::parse_page_url(source_url)?;
        let page = self.http.get(page_url.as_str()).await?;
        if !page.is_success() {
            return Err(FetchError::Status(page.status));
        }
        if !page.is_html() {
            return Err(FetchError::NotHtml(page.content_type.unwrap_or_default()));
        }
        let html = String::from_utf8_lossy(&page.bytes);
        let candidates = self.extractor.extract(&html);
        debug!("Found {} image candidates on {}", candidates.len(), source_url);

        for candidate in candidates {
            let resolved = match url::resolve_image_url(&candidate.url, &page_url) {
                Ok(resolved) => resolved,
                Err(e) => {
                    debug!("Skipping {} candidate: {}", candidate.kind.label(), e);
                    ImageMetrics::record_rejected(candidate.kind.label());
                    continue;
                }
            };
            let min_bytes = (candidate.kind == CandidateKind::Inline)
                .then_some(self.settings.min_inline_bytes);
            match validate::validate_image(self.http.as_ref(), &resolved, &self.settings, min_bytes)
                .await
            {
                Ok(_) => return Ok(Some(resolved)),
                Err(e) => {
                    debug!("Rejected {} candidate {}: {}", candidate.kind.label(), resolved, e);
                    ImageMetrics::record_rejected(candidate.kind.label());
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubHttp;

    const PAGE_URL: &str = "https://www.alpencamps.example/camps/stelvio";
    const ITALY: &str =
        "https://images.unsplash.com/photo-1515542622106-78bda8ba0e5b?w=800&h=400&fit=crop&crop=center";

    fn resolver(http: StubHttp) -> ImageResolver {
        ImageResolver::new(Arc::new(http), FallbackImages::builtin(), ImageSettings::default())
    }

    fn page(head: &str, body: &str) -> String {
        format!("<html><head>{head}</head><body>{body}</body></html>")
    }

    #[tokio::test]
    async fn no_source_uses_the_country_image() {
        let resolved = resolver(StubHttp::new())
            .resolve(None, EventType::Tour, Some("Italy"))
            .await;
        assert_eq!(
            resolved,
            ResolvedImage {
                cover_image: ITALY.into(),
                images: vec![ITALY.into()],
                has_original_image: false,
            }
        );
    }

    #[tokio::test]
    async fn valid_og_image_wins_regardless_of_country() {
        let og = "https://cdn.alpencamps.example/og/stelvio.jpg";
        let http = StubHttp::new()
            .with_page(
                PAGE_URL,
                &page(&format!(r#"<meta property="og:image" content="{og}">"#), ""),
            )
            .with_image(og, "image/jpeg", 800_000);
        let resolved = resolver(http)
            .resolve(Some(PAGE_URL), EventType::Tour, Some("Italy"))
            .await;
        assert_eq!(resolved.cover_image, og);
        assert_eq!(resolved.images, vec![og.to_string()]);
        assert!(resolved.has_original_image);
    }

    #[tokio::test]
    async fn rejected_og_image_falls_through_to_twitter() {
        let http = StubHttp::new()
            .with_page(
                PAGE_URL,
                &page(
                    r#"<meta property="og:image" content="/og.jpg">
                       <meta name="twitter:image" content="/tw.jpg">"#,
                    "",
                ),
            )
            .with_head("https://www.alpencamps.example/og.jpg", 403, None, None)
            .with_image("https://www.alpencamps.example/tw.jpg", "image/png", 120_000);
        let resolved = resolver(http)
            .resolve(Some(PAGE_URL), EventType::Tour, None)
            .await;
        assert_eq!(resolved.cover_image, "https://www.alpencamps.example/tw.jpg");
        assert!(resolved.has_original_image);
    }

    #[tokio::test]
    async fn inline_images_must_beat_the_size_threshold() {
        let http = StubHttp::new()
            .with_page(
                PAGE_URL,
                &page("", r#"<img src="icons/bike.svg"><img src="//cdn.example.org/hero.jpg">"#),
            )
            .with_image("https://www.alpencamps.example/camps/icons/bike.svg", "image/svg+xml", 2_000)
            .with_image("https://cdn.example.org/hero.jpg", "image/jpeg", 50_001);
        let resolved = resolver(http)
            .resolve(Some(PAGE_URL), EventType::Tour, None)
            .await;
        assert_eq!(resolved.cover_image, "https://cdn.example.org/hero.jpg");
    }

    #[tokio::test]
    async fn only_the_first_five_inline_images_are_checked() {
        let body: String = (1..=6).map(|i| format!(r#"<img src="/p/{i}.jpg">"#)).collect();
        let mut http = StubHttp::new().with_page(PAGE_URL, &page("", &body));
        for i in 1..=5 {
            http = http.with_image(&format!("https://www.alpencamps.example/p/{i}.jpg"), "image/jpeg", 10);
        }
        http = http.with_image("https://www.alpencamps.example/p/6.jpg", "image/jpeg", 900_000);

        let http = Arc::new(http);
        let resolver = ImageResolver::new(http.clone(), FallbackImages::builtin(), ImageSettings::default());
        let resolved = resolver
            .resolve(Some(PAGE_URL), EventType::Expedition, Some("Norway"))
            .await;
        assert!(!resolved.has_original_image);
        assert!(resolved.cover_image.contains("photo-1506905925346"));
        assert!(!http.requests().iter().any(|r| r.ends_with("/p/6.jpg")));
    }

    #[tokio::test]
    async fn non_html_sources_are_not_parsed() {
        let og = "https://cdn.alpencamps.example/og/stelvio.jpg";
        let markup = page(&format!(r#"<meta property="og:image" content="{og}">"#), "");
        let http = Arc::new(
            StubHttp::new()
                .with_document(PAGE_URL, "application/pdf", &markup)
                .with_image(og, "image/jpeg", 800_000),
        );
        let resolver = ImageResolver::new(http.clone(), FallbackImages::builtin(), ImageSettings::default());
        let resolved = resolver
            .resolve(Some(PAGE_URL), EventType::Tour, Some("Italy"))
            .await;
        assert_eq!(resolved.cover_image, ITALY);
        assert!(!resolved.has_original_image);
        assert_eq!(http.requests(), [format!("GET {PAGE_URL}")]);
    }

    #[tokio::test]
    async fn unreachable_page_falls_back() {
        let resolved = resolver(StubHttp::new())
            .resolve(Some(PAGE_URL), EventType::TrainingCamp, Some("Atlantis"))
            .await;
        assert!(!resolved.has_original_image);
        assert!(resolved.cover_image.contains("photo-1558618666"));
    }

    #[tokio::test]
    async fn resolution_is_repeatable() {
        let og = "https://cdn.alpencamps.example/og/stelvio.jpg";
        let http = StubHttp::new()
            .with_page(
                PAGE_URL,
                &page(&format!(r#"<meta property="og:image" content="{og}">"#), ""),
            )
            .with_image(og, "image/jpeg", 800_000);
        let resolver = resolver(http);
        let first = resolver.resolve(Some(PAGE_URL), EventType::Tour, Some("Italy")).await;
        let second = resolver.resolve(Some(PAGE_URL), EventType::Tour, Some("Italy")).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn extraction_strategy_is_swappable() {
        struct Fixed;
        impl ImageExtractor for Fixed {
            fn extract(&self, _html: &str) -> Vec<ImageCandidate> {
                vec![ImageCandidate {
                    kind: CandidateKind::SchemaOrg,
                    url: "/fixed.jpg".into(),
                }]
            }
        }
        let http = StubHttp::new()
            .with_page(PAGE_URL, "<html></html>")
            .with_image("https://www.alpencamps.example/fixed.jpg", "image/jpeg", 1);
        let resolved = resolver(http)
            .with_extractor(Arc::new(Fixed))
            .resolve(Some(PAGE_URL), EventType::Tour, None)
            .await;
        assert_eq!(resolved.cover_image, "https://www.alpencamps.example/fixed.jpg");
    }
}
