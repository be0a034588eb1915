use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{EventStore, ImageStats, ImageTarget};
use crate::domain::{Event, LinkUpdate};
use crate::error::{EventsError, Result};
use crate::query::{listing_order, EventPage, EventQuery};

/// In-memory store for development and tests. Events are kept in insertion
/// order, which is the final tie-breaker of the listing order.
#[derive(Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<Event>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<Event>) -> Self {
        Self {
            events: RwLock::new(events),
        }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn query_events(&self, query: &EventQuery) -> Result<EventPage> {
        let events = self.events.read().await;
        let mut matched: Vec<&Event> = events.iter().filter(|e| query.matches(e)).collect();
        // stable, so equal keys stay in insertion order
        matched.sort_by(|a, b| listing_order(a, b));

        let total = matched.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let page = matched
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok(EventPage {
            events: page,
            total,
        })
    }

    async fn get_event_by_slug(&self, slug: &str) -> Result<Option<Event>> {
        let events = self.events.read().await;
        Ok(events.iter().find(|e| e.slug == slug).cloned())
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let events = self.events.read().await;
        Ok(events.iter().any(|e| e.slug == slug))
    }

    async fn find_duplicate(
        &self,
        slug: &str,
        title: &str,
        start_date: DateTime<Utc>,
    ) -> Result<Option<Event>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .find(|e| e.slug == slug || (e.title == title && e.start_date == start_date))
            .cloned())
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        let mut events = self.events.write().await;
        if events.iter().any(|e| e.slug == event.slug) {
            return Err(EventsError::validation(format!(
                "slug '{}' is already taken",
                event.slug
            )));
        }
        events.push(event.clone());
        debug!("Created event: {} with id {}", event.title, event.id);
        Ok(())
    }

    async fn set_published(&self, slug: &str, published: bool) -> Result<Option<Event>> {
        let mut events = self.events.write().await;
        Ok(events.iter_mut().find(|e| e.slug == slug).map(|event| {
            event.published = published;
            event.updated_at = Utc::now();
            event.clone()
        }))
    }

    async fn update_links(&self, slug: &str, links: &LinkUpdate) -> Result<Option<Event>> {
        let mut events = self.events.write().await;
        Ok(events.iter_mut().find(|e| e.slug == slug).map(|event| {
            if let Some(url) = &links.booking_url {
                event.booking_url = Some(url.clone());
            }
            if let Some(url) = &links.website_url {
                event.website_url = Some(url.clone());
            }
            event.updated_at = Utc::now();
            event.clone()
        }))
    }

    async fn update_images(&self, id: Uuid, cover_image: &str, images: &[String]) -> Result<()> {
        let mut events = self.events.write().await;
        let event = events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| EventsError::NotFound(format!("event {id}")))?;
        event.cover_image = Some(cover_image.to_string());
        event.images = images.to_vec();
        event.updated_at = Utc::now();
        debug!("Updated images for event {}", id);
        Ok(())
    }

    async fn events_missing_images(&self) -> Result<Vec<ImageTarget>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| e.needs_image())
            .map(ImageTarget::from)
            .collect())
    }

    async fn image_stats(&self) -> Result<ImageStats> {
        let events = self.events.read().await;
        let with_images = events.iter().filter(|e| !e.needs_image()).count();
        Ok(ImageStats::new(events.len() as u64, with_images as u64))
    }

    async fn events_without_links(&self) -> Result<Vec<Event>> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|e| !e.has_link()).cloned().collect())
    }

    async fn delete_events_without_links(&self) -> Result<u64> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|e| e.has_link());
        Ok((before - events.len()) as u64)
    }

    async fn count_published(&self) -> Result<u64> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|e| e.published).count() as u64)
    }
}
