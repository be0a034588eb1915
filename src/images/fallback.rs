use std::collections::HashMap;

use crate::constants::{COUNTRY_IMAGES, TYPE_IMAGES, UNIVERSAL_DEFAULT_IMAGE};
use crate::domain::EventType;

/// Stock imagery used when a page yields no usable image. Country wins over
/// event type, which wins over the universal default.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackImages {
    /// Keyed by trimmed, lowercased country name
    by_country: HashMap<String, String>,
    by_type: HashMap<EventType, String>,
    default: String,
}

fn country_key(country: &str) -> String {
    country.trim().to_lowercase()
}

impl FallbackImages {
    /// Empty tables; every lookup lands on `default`.
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            by_country: HashMap::new(),
            by_type: HashMap::new(),
            default: default.into(),
        }
    }

    /// The stock tables shipped with the catalog.
    pub fn builtin() -> Self {
        let mut images = Self::new(UNIVERSAL_DEFAULT_IMAGE);
        for (country, url) in COUNTRY_IMAGES {
            images = images.with_country(country, *url);
        }
        for (wire, url) in TYPE_IMAGES {
            if let Ok(event_type) = wire.parse::<EventType>() {
                images = images.with_type(event_type, *url);
            }
        }
        images
    }

    pub fn with_country(mut self, country: &str, url: impl Into<String>) -> Self {
        self.by_country.insert(country_key(country), url.into());
        self
    }

    pub fn with_type(mut self, event_type: EventType, url: impl Into<String>) -> Self {
        self.by_type.insert(event_type, url.into());
        self
    }

    pub fn with_default(mut self, url: impl Into<String>) -> Self {
        self.default = url.into();
        self
    }

    pub fn select(&self, event_type: EventType, country: Option<&str>) -> &str {
        country
            .and_then(|c| self.by_country.get(&country_key(c)))
            .or_else(|| self.by_type.get(&event_type))
            .unwrap_or(&self.default)
    }

    pub fn default_image(&self) -> &str {
        &self.default
    }
}

impl Default for FallbackImages {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITALY: &str =
        "https://images.unsplash.com/photo-1515542622106-78bda8ba0e5b?w=800&h=400&fit=crop&crop=center";

    #[test]
    fn country_then_type_then_default() {
        let images = FallbackImages::builtin();
        assert_eq!(images.select(EventType::Tour, Some("Italy")), ITALY);
        assert_eq!(images.select(EventType::Tour, Some("  italy ")), ITALY);

        let tour = images.select(EventType::Tour, Some("Atlantis"));
        assert!(tour.contains("photo-1517654443271"));
        assert_eq!(images.select(EventType::Tour, None), tour);

        let bare = FallbackImages::new("https://img.example.com/default.jpg");
        assert_eq!(
            bare.select(EventType::Expedition, Some("Italy")),
            "https://img.example.com/default.jpg"
        );
    }

    #[test]
    fn every_event_type_has_stock_imagery() {
        let images = FallbackImages::builtin();
        for event_type in EventType::ALL {
            assert_ne!(images.select(*event_type, None), "");
            assert!(images.by_type.contains_key(event_type));
        }
    }

    #[test]
    fn overrides_replace_builtin_entries() {
        let images = FallbackImages::builtin()
            .with_country("Italy", "https://img.example.com/it.jpg")
            .with_type(EventType::Tour, "https://img.example.com/tour.jpg");
        assert_eq!(images.select(EventType::Tour, Some("ITALY")), "https://img.example.com/it.jpg");
        assert_eq!(images.select(EventType::Tour, Some("Peru")), "https://img.example.com/tour.jpg");
    }
}
