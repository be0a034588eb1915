use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::constants::DEFAULT_MAX_INLINE_IMAGES;

/// Where on the page a candidate image URL was found. Declaration order is the
/// acceptance priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CandidateKind {
    OpenGraph,
    TwitterCard,
    SchemaOrg,
    Inline,
}

impl CandidateKind {
    pub fn label(&self) -> &'static str {
        match self {
            CandidateKind::OpenGraph => "og:image",
            CandidateKind::TwitterCard => "twitter:image",
            CandidateKind::SchemaOrg => "schema.org",
            CandidateKind::Inline => "img",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub kind: CandidateKind,
    /// As written in the document; may be relative.
    pub url: String,
}

impl ImageCandidate {
    fn new(kind: CandidateKind, url: &str) -> Option<Self> {
        let url = url.trim();
        (!url.is_empty()).then(|| Self {
            kind,
            url: url.to_string(),
        })
    }
}

/// Pulls candidate image URLs out of a fetched document, in priority order:
/// at most one each of Open Graph, Twitter Card and schema.org, then the
/// first few inline `<img>` sources in document order.
pub trait ImageExtractor: Send + Sync {
    fn extract(&self, html: &str) -> Vec<ImageCandidate>;
}

static OG_IMAGE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:image"], meta[property="og:image:url"]"#).unwrap()
});
static TWITTER_IMAGE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[name="twitter:image"], meta[property="twitter:image"]"#).unwrap()
});
static LD_JSON: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());

static SCHEMA_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""image"\s*:\s*"([^"]+)""#).unwrap());

/// DOM-based extractor built on `scraper`.
pub struct HtmlImageExtractor {
    max_inline_images: usize,
}

impl HtmlImageExtractor {
    pub fn new(max_inline_images: usize) -> Self {
        Self { max_inline_images }
    }
}

impl Default for HtmlImageExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INLINE_IMAGES)
    }
}

fn first_meta_content(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

/// First usable `image` value in a JSON-LD tree. `image` may be a string, a
/// list, or an `ImageObject` with a `url`.
fn json_ld_image(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(image) = map.get("image").and_then(image_value) {
                return Some(image);
            }
            map.values().find_map(json_ld_image)
        }
        Value::Array(items) => items.iter().find_map(json_ld_image),
        _ => None,
    }
}

fn image_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(image_value),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("contentUrl"))
            .and_then(image_value),
        _ => None,
    }
}

impl ImageExtractor for HtmlImageExtractor {
    fn extract(&self, html: &str) -> Vec<ImageCandidate> {
        let doc = Html::parse_document(html);
        let mut candidates = Vec::new();

        if let Some(url) = first_meta_content(&doc, &OG_IMAGE) {
            candidates.extend(ImageCandidate::new(CandidateKind::OpenGraph, &url));
        }
        if let Some(url) = first_meta_content(&doc, &TWITTER_IMAGE) {
            candidates.extend(ImageCandidate::new(CandidateKind::TwitterCard, &url));
        }

        let schema = doc
            .select(&LD_JSON)
            .filter_map(|script| {
                let body: String = script.text().collect();
                serde_json::from_str::<Value>(&body).ok()
            })
            .find_map(|value| json_ld_image(&value))
            // Inline JSON blobs that are not proper ld+json scripts
            .or_else(|| {
                SCHEMA_IMAGE_RE
                    .captures(html)
                    .map(|c| c[1].replace("\\/", "/"))
            });
        if let Some(url) = schema {
            candidates.extend(ImageCandidate::new(CandidateKind::SchemaOrg, &url));
        }

        candidates.extend(
            doc.select(&IMG)
                .filter_map(|img| img.value().attr("src"))
                .filter_map(|src| ImageCandidate::new(CandidateKind::Inline, src))
                .take(self.max_inline_images),
        );
        candidates
    }
}

static OG_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<meta property="og:image" content="([^"]+)""#).unwrap());
static TWITTER_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<meta name="twitter:image" content="([^"]+)""#).unwrap());
static IMG_SRC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<img[^>]+src="([^"]+)"[^>]*>"#).unwrap());

/// Pattern-matching extractor for markup that does not survive DOM parsing.
/// Only matches the exact attribute layouts most CMSes emit.
pub struct RegexImageExtractor {
    max_inline_images: usize,
}

impl RegexImageExtractor {
    pub fn new(max_inline_images: usize) -> Self {
        Self { max_inline_images }
    }
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

impl ImageExtractor for RegexImageExtractor {
    fn extract(&self, html: &str) -> Vec<ImageCandidate> {
        let mut candidates = Vec::new();
        let single = [
            (CandidateKind::OpenGraph, &*OG_IMAGE_RE),
            (CandidateKind::TwitterCard, &*TWITTER_IMAGE_RE),
            (CandidateKind::SchemaOrg, &*SCHEMA_IMAGE_RE),
        ];
        for (kind, re) in single {
            if let Some(c) = re.captures(html) {
                candidates.extend(ImageCandidate::new(kind, &decode_entities(&c[1])));
            }
        }
        candidates.extend(
            IMG_SRC_RE
                .captures_iter(html)
                .take(self.max_inline_images)
                .filter_map(|c| ImageCandidate::new(CandidateKind::Inline, &decode_entities(&c[1]))),
        );
        candidates
    }
}
