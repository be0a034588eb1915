use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument};

use super::ImageResolver;
use crate::error::Result;
use crate::storage::{EventStore, ImageTarget};

/// Outcome of a bulk image run. Per-event failures never abort the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub updated_count: u64,
    pub errors: Vec<String>,
}

/// Resolve and persist a cover image for every event that lacks one, at most
/// `concurrency` events at a time. Only loading the batch can fail.
#[instrument(skip(store, resolver))]
pub async fn backfill_images(
    store: Arc<dyn EventStore>,
    resolver: Arc<ImageResolver>,
    concurrency: usize,
) -> Result<BackfillReport> {
    let targets = store.events_missing_images().await?;
    info!("Found {} events without images", targets.len());

    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for target in targets {
        let store = store.clone();
        let resolver = resolver.clone();
        let permits = permits.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            update_one(store.as_ref(), &resolver, &target)
                .await
                .map_err(|e| format!("Error updating {}: {}", target.title, e))
        });
    }

    let mut report = BackfillReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => report.updated_count += 1,
            Ok(Err(message)) => {
                error!("{}", message);
                report.errors.push(message);
            }
            Err(e) => {
                error!("Image backfill task failed: {}", e);
                report.errors.push(format!("Image backfill task failed: {e}"));
            }
        }
    }
    info!(
        "Image backfill finished: {} updated, {} errors",
        report.updated_count,
        report.errors.len()
    );
    Ok(report)
}

async fn update_one(
    store: &dyn EventStore,
    resolver: &ImageResolver,
    target: &ImageTarget,
) -> Result<()> {
    let resolved = resolver
        .resolve(
            target.source_url.as_deref(),
            target.event_type,
            Some(target.country.as_str()),
        )
        .await;
    store
        .update_images(target.id, &resolved.cover_image, &resolved.images)
        .await?;
    info!(
        "Updated {} with {} image",
        target.title,
        if resolved.has_original_image { "original" } else { "stock" }
    );
    Ok(())
}
