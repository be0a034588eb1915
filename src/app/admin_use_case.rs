use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::Result;
use crate::images::{backfill_images, BackfillReport, ImageResolver};
use crate::storage::{EventStore, ImageStats};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlinkedEvent {
    pub slug: String,
    pub title: String,
    pub published: bool,
}

/// What a cleanup would delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupPreview {
    pub count: u64,
    pub events: Vec<UnlinkedEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub deleted_count: u64,
    pub remaining_published: u64,
}

/// Catalog maintenance: removing events nobody can book, and keeping cover
/// images filled in.
pub struct CatalogAdminUseCase {
    store: Arc<dyn EventStore>,
    resolver: Arc<ImageResolver>,
    backfill_concurrency: usize,
}

impl CatalogAdminUseCase {
    pub fn new(
        store: Arc<dyn EventStore>,
        resolver: Arc<ImageResolver>,
        backfill_concurrency: usize,
    ) -> Self {
        Self {
            store,
            resolver,
            backfill_concurrency,
        }
    }

    pub async fn cleanup_preview(&self) -> Result<CleanupPreview> {
        let events: Vec<UnlinkedEvent> = self
            .store
            .events_without_links()
            .await?
            .into_iter()
            .map(|e| UnlinkedEvent {
                slug: e.slug,
                title: e.title,
                published: e.published,
            })
            .collect();
        Ok(CleanupPreview {
            count: events.len() as u64,
            events,
        })
    }

    /// Delete every event with neither a booking nor a website link.
    #[instrument(skip(self))]
    pub async fn cleanup(&self) -> Result<CleanupReport> {
        let deleted_count = self.store.delete_events_without_links().await?;
        let remaining_published = self.store.count_published().await?;
        info!(
            "Deleted {} events without links, {} published events remain",
            deleted_count, remaining_published
        );
        Ok(CleanupReport {
            deleted_count,
            remaining_published,
        })
    }

    pub async fn image_status(&self) -> Result<ImageStats> {
        self.store.image_stats().await
    }

    pub async fn backfill_images(&self) -> Result<BackfillReport> {
        backfill_images(
            self.store.clone(),
            self.resolver.clone(),
            self.backfill_concurrency,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::{FallbackImages, ImageSettings};
    use crate::storage::InMemoryEventStore;
    use crate::test_support::{sample_event, StubHttp};
    use chrono::Utc;

    fn admin(store: Arc<InMemoryEventStore>) -> CatalogAdminUseCase {
        let resolver = Arc::new(ImageResolver::new(
            Arc::new(StubHttp::new()),
            FallbackImages::builtin(),
            ImageSettings::default(),
        ));
        CatalogAdminUseCase::new(store, resolver, 2)
    }

    #[tokio::test]
    async fn preview_then_cleanup() {
        let linked = sample_event("Col du Galibier Day", Utc::now());
        let mut unlinked = sample_event("Unknown Organiser Ride", Utc::now());
        unlinked.booking_url = None;
        let mut draft = sample_event("Draft Without Links", Utc::now());
        draft.booking_url = None;
        draft.published = false;
        let store = Arc::new(InMemoryEventStore::with_events(vec![linked, unlinked, draft]));
        let admin = admin(store);

        let preview = admin.cleanup_preview().await.unwrap();
        assert_eq!(preview.count, 2);
        assert_eq!(preview.events[0].slug, "unknown-organiser-ride");

        let report = admin.cleanup().await.unwrap();
        assert_eq!(
            report,
            CleanupReport {
                deleted_count: 2,
                remaining_published: 1
            }
        );
        assert_eq!(admin.cleanup_preview().await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn backfill_updates_image_status() {
        let events = vec![
            sample_event("Col du Galibier Day", Utc::now()),
            sample_event("Alpe d'Huez Sunrise", Utc::now()),
        ];
        let admin = admin(Arc::new(InMemoryEventStore::with_events(events)));

        let before = admin.image_status().await.unwrap();
        assert_eq!(before.events_without_images, 2);
        assert_eq!(before.coverage_percentage, 0);

        let report = admin.backfill_images().await.unwrap();
        assert_eq!(report.updated_count, 2);
        assert!(report.errors.is_empty());

        let after = admin.image_status().await.unwrap();
        assert_eq!(after.events_with_images, 2);
        assert_eq!(after.coverage_percentage, 100);
    }
}
