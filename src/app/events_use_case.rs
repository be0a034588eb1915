use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::auth::CurrentUser;
use crate::domain::{slugify, Event, EventPayload, EventSource, LinkUpdate};
use crate::error::{EventsError, Result};
use crate::images::ImageResolver;
use crate::storage::EventStore;

/// Result of importing a batch of events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub created: u64,
    pub skipped: u64,
    pub errors: Vec<String>,
}

/// Use case for writing events into the catalog: user submissions, automated
/// imports, moderation and link corrections.
pub struct EventsUseCase {
    store: Arc<dyn EventStore>,
    resolver: Option<Arc<ImageResolver>>,
}

impl EventsUseCase {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            resolver: None,
        }
    }

    /// Imported events without a cover image get one from `resolver`.
    pub fn with_image_resolver(mut self, resolver: Arc<ImageResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Store a user submission. Submissions start unpublished and wait for
    /// moderation.
    #[instrument(skip(self, payload))]
    pub async fn create_event(
        &self,
        user: Option<&CurrentUser>,
        payload: EventPayload,
    ) -> Result<Event> {
        let user = user.ok_or_else(|| EventsError::Unauthorized("Unauthorized".to_string()))?;
        let new_event = payload.validate()?;
        let slug = self.unique_slug(&new_event.title).await?;
        let event = new_event.into_event(
            slug,
            EventSource::User,
            false,
            Some(user.summary()),
            Utc::now(),
        );
        self.store.insert_event(&event).await?;
        info!("Created event {} ({}) for user {}", event.title, event.slug, user.id);
        Ok(event)
    }

    /// `slugify(title)`, suffixed with `-1`, `-2`, ... until it is free.
    pub async fn unique_slug(&self, title: &str) -> Result<String> {
        let mut base = slugify(title);
        if base.is_empty() {
            base = "event".to_string();
        }
        self.free_slug(base).await
    }

    async fn free_slug(&self, base: String) -> Result<String> {
        if !self.store.slug_exists(&base).await? {
            return Ok(base);
        }
        let mut counter = 1u32;
        loop {
            let candidate = format!("{base}-{counter}");
            if !self.store.slug_exists(&candidate).await? {
                debug!("Slug {} taken, using {}", base, candidate);
                return Ok(candidate);
            }
            counter += 1;
        }
    }

    /// Import events from a scraper or partner feed. Imported events are
    /// published immediately under a dated slug; anything already in the
    /// catalog (same dated slug, or same title and start) is skipped. Bad payloads are reported, not fatal.
    #[instrument(skip(self, payloads), fields(count = payloads.len()))]
    pub async fn ingest_events(
        &self,
        payloads: Vec<EventPayload>,
        source: EventSource,
    ) -> Result<IngestReport> {
        if source == EventSource::User {
            return Err(EventsError::validation(
                "imports must use the SCRAPED or API source",
            ));
        }

        let mut report = IngestReport::default();
        for payload in payloads {
            let title = payload.title.clone();
            let new_event = match payload.validate() {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping invalid event {}: {}", title, e);
                    report.errors.push(format!("Invalid event {title}: {e}"));
                    continue;
                }
            };

            let dated = import_slug(&new_event.title, new_event.start_date);
            let slug = match self
                .store
                .find_duplicate(&dated, &new_event.title, new_event.start_date)
                .await?
            {
                Some(existing)
                    if existing.title == new_event.title
                        || existing.start_date == new_event.start_date =>
                {
                    debug!("Event already exists: {}", new_event.title);
                    report.skipped += 1;
                    continue;
                }
                // Another event normalised to the same slug
                Some(_) => self.free_slug(dated).await?,
                None => dated,
            };

            let mut event = new_event.into_event(slug, source, true, None, Utc::now());
            if event.needs_image() {
                if let Some(resolver) = &self.resolver {
                    let resolved = resolver
                        .resolve(
                            event.source_url.as_deref(),
                            event.event_type,
                            Some(event.country.as_str()),
                        )
                        .await;
                    event.cover_image = Some(resolved.cover_image);
                    event.images = resolved.images;
                }
            }

            match self.store.insert_event(&event).await {
                Ok(()) => {
                    info!("Imported event: {}", event.title);
                    report.created += 1;
                }
                Err(e) => report.errors.push(format!("Error saving {}: {}", event.title, e)),
            }
        }
        info!(
            "Import finished: {} created, {} skipped, {} errors",
            report.created,
            report.skipped,
            report.errors.len()
        );
        Ok(report)
    }

    /// A single published event. Drafts are reported as missing.
    pub async fn get_published_event(&self, slug: &str) -> Result<Event> {
        self.store
            .get_event_by_slug(slug)
            .await?
            .filter(|e| e.published)
            .ok_or_else(|| EventsError::NotFound(format!("Event '{slug}' not found")))
    }

    pub async fn set_published(&self, slug: &str, published: bool) -> Result<Event> {
        let event = self
            .store
            .set_published(slug, published)
            .await?
            .ok_or_else(|| EventsError::NotFound(format!("Event '{slug}' not found")))?;
        info!(
            "{} event {}",
            if published { "Published" } else { "Unpublished" },
            slug
        );
        Ok(event)
    }

    /// Set booking and/or website links. Links left out keep their value.
    pub async fn update_links(&self, slug: &str, links: LinkUpdate) -> Result<Event> {
        let links = links.validate()?;
        if links.booking_url.is_none() && links.website_url.is_none() {
            return Err(EventsError::validation(
                "provide a bookingUrl or a websiteUrl",
            ));
        }
        let event = self
            .store
            .update_links(slug, &links)
            .await?
            .ok_or_else(|| EventsError::NotFound(format!("Event '{slug}' not found")))?;
        info!("Updated links for {}", slug);
        Ok(event)
    }
}

/// Imported events carry their start day in the slug so recurring editions
/// of the same event get distinct slugs.
fn import_slug(title: &str, start: DateTime<Utc>) -> String {
    let base = slugify(title);
    let day = start.format("%Y%m%d");
    if base.is_empty() {
        format!("event-{day}")
    } else {
        format!("{base}-{day}")
    }
}
