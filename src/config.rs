use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::constants::{
    DEFAULT_BACKFILL_CONCURRENCY, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_LIMIT,
    DEFAULT_MAX_IMAGE_BYTES, DEFAULT_MAX_INLINE_IMAGES, DEFAULT_MIN_INLINE_IMAGE_BYTES,
    DEFAULT_USER_AGENT,
};
use crate::domain::EventType;
use crate::error::{EventsError, Result};
use crate::images::{FallbackImages, ImageSettings};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub listing: ListingConfig,
    pub images: ImagesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token for `/admin` routes. Unset leaves them open.
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            admin_token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file, or `:memory:` for a throwaway in-process store
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/events.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus listener, e.g. `127.0.0.1:9464`. Unset disables the exporter.
    pub addr: Option<SocketAddr>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub default_limit: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub min_inline_bytes: u64,
    pub max_image_bytes: u64,
    pub max_inline_images: usize,
    pub backfill_concurrency: usize,
    pub default_image: Option<String>,
    /// Country name to image URL, merged over the built-in table
    pub country_images: HashMap<String, String>,
    /// Event type wire name (e.g. `TOUR`) to image URL
    pub type_images: HashMap<String, String>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_FETCH_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_inline_bytes: DEFAULT_MIN_INLINE_IMAGE_BYTES,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_inline_images: DEFAULT_MAX_INLINE_IMAGES,
            backfill_concurrency: DEFAULT_BACKFILL_CONCURRENCY,
            default_image: None,
            country_images: HashMap::new(),
            type_images: HashMap::new(),
        }
    }
}

impl ImagesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    pub fn settings(&self) -> ImageSettings {
        ImageSettings {
            min_inline_bytes: self.min_inline_bytes,
            max_image_bytes: self.max_image_bytes,
            max_inline_images: self.max_inline_images,
        }
    }

    /// Built-in stock tables with the configured overrides applied.
    pub fn fallback_images(&self) -> Result<FallbackImages> {
        let mut images = FallbackImages::builtin();
        if let Some(default) = &self.default_image {
            images = images.with_default(default.clone());
        }
        for (country, url) in &self.country_images {
            images = images.with_country(country, url.clone());
        }
        for (wire, url) in &self.type_images {
            let event_type: EventType = wire
                .parse()
                .map_err(|e: String| EventsError::Config(format!("images.type_images: {e}")))?;
            images = images.with_type(event_type, url.clone());
        }
        Ok(images)
    }
}

impl AppConfig {
    /// Read `path` if it exists, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                EventsError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            toml::from_str(&content)?
        } else {
            warn!("Config file {} not found, using defaults", path.display());
            AppConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = var("EVENTS_DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(port) = var("EVENTS_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| EventsError::Config(format!("EVENTS_PORT '{port}' is not a port")))?;
        }
        if let Some(token) = var("EVENTS_ADMIN_TOKEN") {
            self.server.admin_token = Some(token).filter(|t| !t.trim().is_empty());
        }
        if let Some(dir) = var("EVENTS_LOG_DIR") {
            self.logging.dir = dir;
        }
        if let Some(addr) = var("EVENTS_METRICS_ADDR") {
            self.metrics.addr = Some(addr.parse().map_err(|_| {
                EventsError::Config(format!("EVENTS_METRICS_ADDR '{addr}' is not a socket address"))
            })?);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.listing.default_limit == 0 {
            return Err(EventsError::Config(
                "listing.default_limit must be at least 1".to_string(),
            ));
        }
        if self.images.min_inline_bytes >= self.images.max_image_bytes {
            return Err(EventsError::Config(
                "images.min_inline_bytes must be below images.max_image_bytes".to_string(),
            ));
        }
        self.images.fallback_images().map(|_| ())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| EventsError::Config(format!("invalid server address: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, "data/events.db");
        assert_eq!(config.listing.default_limit, 12);
        assert_eq!(config.images.settings(), ImageSettings::default());
        assert!(config.metrics.addr.is_none());
    }

    #[test]
    fn image_overrides_reach_the_fallback_tables() {
        let config = AppConfig::from_toml(
            r#"
            [images]
            default_image = "https://img.example.com/default.jpg"
            [images.country_images]
            Iceland = "https://img.example.com/iceland.jpg"
            [images.type_images]
            EXPEDITION = "https://img.example.com/expedition.jpg"
            "#,
        )
        .unwrap();
        let images = config.images.fallback_images().unwrap();
        assert_eq!(
            images.select(EventType::Tour, Some("iceland")),
            "https://img.example.com/iceland.jpg"
        );
        assert_eq!(
            images.select(EventType::Expedition, Some("Mars")),
            "https://img.example.com/expedition.jpg"
        );
        assert_eq!(images.default_image(), "https://img.example.com/default.jpg");
    }

    #[test]
    fn unknown_event_type_in_overrides_is_rejected() {
        let err = AppConfig::from_toml(
            r#"
            [images.type_images]
            GRAN_FONDO = "https://img.example.com/gf.jpg"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, EventsError::Config(_)));
    }

    #[test]
    fn environment_overrides() {
        let mut config = AppConfig::default();
        let env: HashMap<&str, &str> = [
            ("EVENTS_DATABASE_PATH", ":memory:"),
            ("EVENTS_PORT", "9000"),
            ("EVENTS_ADMIN_TOKEN", "s3cret"),
            ("EVENTS_METRICS_ADDR", "127.0.0.1:9464"),
        ]
        .into_iter()
        .collect();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.database.path, ":memory:");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.admin_token.as_deref(), Some("s3cret"));
        assert_eq!(config.metrics.addr.unwrap().port(), 9464);

        let mut config = AppConfig::default();
        assert!(config
            .apply_env_overrides(|k| (k == "EVENTS_PORT").then(|| "http".to_string()))
            .is_err());
    }
}
