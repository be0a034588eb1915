//! Fixtures and port doubles shared by the unit tests and, through
//! `tests/common`, the integration tests. Paths go through `super` so the
//! file resolves against either parent.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::app::ports::{FetchError, HttpClientPort, HttpGetResult, HttpHeadResult};
use super::domain::{slugify, Difficulty, Event, EventCounts, EventSource, EventType, Terrain};

pub fn sample_event(title: &str, start: DateTime<Utc>) -> Event {
    let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    Event {
        id: Uuid::new_v4(),
        slug: slugify(title),
        title: title.to_string(),
        description: "A week of structured endurance riding with coached group sessions.".into(),
        event_type: EventType::Tour,
        difficulty: Difficulty::Intermediate,
        terrain: vec![Terrain::Road],
        country: "Italy".into(),
        region: None,
        city: None,
        venue: None,
        start_date: start,
        end_date: start + Duration::days(2),
        duration: 3,
        distance: None,
        elevation: None,
        price_min: Some(500.0),
        price_max: Some(900.0),
        currency: "EUR".into(),
        max_participants: Some(20),
        current_bookings: 0,
        booking_url: Some(format!("https://book.example.com/{}", slugify(title))),
        website_url: None,
        cover_image: None,
        images: Vec::new(),
        amenities: Vec::new(),
        included: Vec::new(),
        not_included: Vec::new(),
        languages: vec!["English".into()],
        source: EventSource::Scraped,
        source_url: None,
        published: true,
        verified: false,
        featured: false,
        organizer: None,
        user: None,
        counts: EventCounts::default(),
        created_at: created,
        updated_at: created,
    }
}

/// Canned HTTP responses keyed by URL. Unknown URLs fail like an unreachable host.
#[derive(Default)]
pub struct StubHttp {
    pages: HashMap<String, HttpGetResult>,
    heads: HashMap<String, HttpHeadResult>,
    pub requested: Mutex<Vec<String>>,
}

impl StubHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.with_document(url, "text/html; charset=utf-8", html)
    }

    pub fn with_document(mut self, url: &str, content_type: &str, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            HttpGetResult {
                status: 200,
                bytes: body.as_bytes().to_vec(),
                content_type: Some(content_type.to_string()),
            },
        );
        self
    }

    pub fn with_image(self, url: &str, content_type: &str, size: u64) -> Self {
        self.with_head(url, 200, Some(content_type), Some(size))
    }

    pub fn with_head(
        mut self,
        url: &str,
        status: u16,
        content_type: Option<&str>,
        content_length: Option<u64>,
    ) -> Self {
        self.heads.insert(
            url.to_string(),
            HttpHeadResult {
                status,
                content_type: content_type.map(str::to_string),
                content_length,
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requested.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn log(&self, method: &str, url: &str) {
        if let Ok(mut r) = self.requested.lock() {
            r.push(format!("{method} {url}"));
        }
    }
}

#[async_trait]
impl HttpClientPort for StubHttp {
    async fn get(&self, url: &str) -> Result<HttpGetResult, FetchError> {
        self.log("GET", url);
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Http(format!("connection refused: {url}")))
    }

    async fn head(&self, url: &str) -> Result<HttpHeadResult, FetchError> {
        self.log("HEAD", url);
        self.heads
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Http(format!("connection refused: {url}")))
    }
}
