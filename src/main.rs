use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use cycling_events::app::{CatalogAdminUseCase, EventsUseCase};
use cycling_events::config::AppConfig;
use cycling_events::domain::{EventPayload, EventSource};
use cycling_events::images::ImageResolver;
use cycling_events::infra::http_client::ReqwestHttp;
use cycling_events::server::{start_server, AppState};
use cycling_events::storage::{self, EventStore};
use cycling_events::{logging, metrics};

#[derive(Parser)]
#[command(name = "cycling-events")]
#[command(about = "Cycling events catalog: listings, submissions and cover images")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ImportSource {
    Scraped,
    Api,
}

impl From<ImportSource> for EventSource {
    fn from(source: ImportSource) -> Self {
        match source {
            ImportSource::Scraped => EventSource::Scraped,
            ImportSource::Api => EventSource::Api,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Resolve cover images for every event that has none
    BackfillImages,
    /// Show how many events have a cover image
    ImageStatus,
    /// List events with neither a booking nor a website link
    Cleanup {
        /// Delete them instead of only listing them
        #[arg(long)]
        apply: bool,
    },
    /// Publish (or unpublish) an event by slug
    Publish {
        slug: String,
        #[arg(long)]
        unpublish: bool,
    },
    /// Import events from a JSON file containing an array of event payloads
    Import {
        file: PathBuf,
        #[arg(long, value_enum, default_value = "scraped")]
        source: ImportSource,
    },
}

fn build_resolver(config: &AppConfig) -> anyhow::Result<Arc<ImageResolver>> {
    let http = ReqwestHttp::new(config.images.timeout(), &config.images.user_agent)
        .context("failed to build HTTP client")?;
    Ok(Arc::new(ImageResolver::new(
        Arc::new(http),
        config.images.fallback_images()?,
        config.images.settings(),
    )))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;
    let _log_guard = logging::init_logging(&config.logging.dir)
        .with_context(|| format!("failed to create log directory {}", config.logging.dir))?;

    let store: Arc<dyn EventStore> = storage::open(&config.database)?;
    let resolver = build_resolver(&config)?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(addr) = config.metrics.addr {
                metrics::init_metrics(addr);
            }
            let mut addr = config.bind_addr()?;
            if let Some(port) = port {
                addr.set_port(port);
            }
            let state = AppState::new(store, resolver, &config);
            start_server(state, addr).await?;
        }
        Commands::BackfillImages => {
            println!("🖼️  Backfilling cover images...");
            let admin = CatalogAdminUseCase::new(
                store,
                resolver,
                config.images.backfill_concurrency,
            );
            let report = admin.backfill_images().await?;
            println!("   Updated: {}", report.updated_count);
            if !report.errors.is_empty() {
                warn!("{} events could not be updated", report.errors.len());
                println!("\n⚠️  Errors encountered:");
                for e in &report.errors {
                    println!("   - {}", e);
                }
            }
        }
        Commands::ImageStatus => {
            let admin = CatalogAdminUseCase::new(store, resolver, 1);
            let stats = admin.image_status().await?;
            println!("📊 Image coverage");
            println!("   Total events:    {}", stats.total_events);
            println!("   With images:     {}", stats.events_with_images);
            println!("   Without images:  {}", stats.events_without_images);
            println!("   Coverage:        {}%", stats.coverage_percentage);
        }
        Commands::Cleanup { apply } => {
            let admin = CatalogAdminUseCase::new(store, resolver, 1);
            let preview = admin.cleanup_preview().await?;
            println!("🔎 {} events without booking or website links", preview.count);
            for event in &preview.events {
                println!("   - {} ({})", event.title, event.slug);
            }
            if apply {
                let report = admin.cleanup().await?;
                println!("🧹 Deleted {} events", report.deleted_count);
                println!("   Remaining published events: {}", report.remaining_published);
            } else if preview.count > 0 {
                println!("\nRe-run with --apply to delete them.");
            }
        }
        Commands::Publish { slug, unpublish } => {
            let events = EventsUseCase::new(store);
            match events.set_published(&slug, !unpublish).await {
                Ok(event) => println!(
                    "✅ {} is now {}",
                    event.title,
                    if event.published { "published" } else { "unpublished" }
                ),
                Err(e) => {
                    error!("Publish failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Commands::Import { file, source } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let payloads: Vec<EventPayload> = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a JSON array of events", file.display()))?;
            info!("Importing {} events from {}", payloads.len(), file.display());

            let events = EventsUseCase::new(store).with_image_resolver(resolver);
            let report = events.ingest_events(payloads, source.into()).await?;
            println!("📥 Import results");
            println!("   Created: {}", report.created);
            println!("   Skipped: {}", report.skipped);
            println!("   Errors:  {}", report.errors.len());
            for e in &report.errors {
                println!("   - {}", e);
            }
        }
    }
    Ok(())
}
