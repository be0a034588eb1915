//! Event store: the only layer that applies the public listing predicate.

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryEventStore;
pub use sqlite::SqliteEventStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::domain::{Event, EventType, LinkUpdate};
use crate::error::Result;
use crate::query::{EventPage, EventQuery};

/// What the image pipeline needs to know about an event lacking a cover image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageTarget {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub country: String,
    pub source_url: Option<String>,
}

impl From<&Event> for ImageTarget {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            event_type: event.event_type,
            country: event.country.clone(),
            source_url: event.source_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStats {
    pub total_events: u64,
    pub events_with_images: u64,
    pub events_without_images: u64,
    pub coverage_percentage: u64,
}

impl ImageStats {
    pub fn new(total_events: u64, events_with_images: u64) -> Self {
        let coverage_percentage = if total_events == 0 {
            0
        } else {
            (events_with_images * 100 + total_events / 2) / total_events
        };
        Self {
            total_events,
            events_with_images,
            events_without_images: total_events.saturating_sub(events_with_images),
            coverage_percentage,
        }
    }
}

/// Storage trait for the event catalog
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Filter, order and paginate listable events. Implementations must apply the
    /// published-with-link predicate before counting.
    async fn query_events(&self, query: &EventQuery) -> Result<EventPage>;

    async fn get_event_by_slug(&self, slug: &str) -> Result<Option<Event>>;
    async fn slug_exists(&self, slug: &str) -> Result<bool>;
    /// An event with the same slug, or the same title starting at the same instant.
    async fn find_duplicate(
        &self,
        slug: &str,
        title: &str,
        start_date: DateTime<Utc>,
    ) -> Result<Option<Event>>;
    async fn insert_event(&self, event: &Event) -> Result<()>;

    // Moderation and corrections
    async fn set_published(&self, slug: &str, published: bool) -> Result<Option<Event>>;
    /// Overwrites only the links present in `links`.
    async fn update_links(&self, slug: &str, links: &LinkUpdate) -> Result<Option<Event>>;

    // Image pipeline
    async fn update_images(&self, id: Uuid, cover_image: &str, images: &[String]) -> Result<()>;
    async fn events_missing_images(&self) -> Result<Vec<ImageTarget>>;
    async fn image_stats(&self) -> Result<ImageStats>;

    // Cleanup
    async fn events_without_links(&self) -> Result<Vec<Event>>;
    async fn delete_events_without_links(&self) -> Result<u64>;
    async fn count_published(&self) -> Result<u64>;
}

/// Open the configured store; `:memory:` selects the in-process store.
pub fn open(config: &DatabaseConfig) -> Result<Arc<dyn EventStore>> {
    if config.path == ":memory:" {
        info!("Using in-memory event store");
        return Ok(Arc::new(InMemoryEventStore::new()));
    }
    info!("Opening SQLite event store at {}", config.path);
    Ok(Arc::new(SqliteEventStore::open(&config.path)?))
}
