use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    duration_days, DateInput, Difficulty, Event, EventCounts, EventSource, EventType, Terrain,
    UserSummary,
};
use crate::constants::DEFAULT_CURRENCY;
use crate::error::{EventsError, Result};

/// Event as submitted by a client or an ingestion job, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub terrain: Vec<Terrain>,

    pub country: String,
    pub region: Option<String>,
    pub city: Option<String>,
    pub venue: Option<String>,

    pub start_date: String,
    pub end_date: String,
    pub distance: Option<f64>,
    pub elevation: Option<f64>,

    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub currency: Option<String>,
    pub max_participants: Option<i64>,

    pub booking_url: Option<String>,
    pub website_url: Option<String>,

    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub included: Vec<String>,
    #[serde(default)]
    pub not_included: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,

    pub cover_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,

    /// Page the event was found on; only meaningful for ingested events.
    pub source_url: Option<String>,
}

/// A payload that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub event_type: EventType,
    pub difficulty: Difficulty,
    pub terrain: Vec<Terrain>,
    pub country: String,
    pub region: Option<String>,
    pub city: Option<String>,
    pub venue: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub distance: Option<f64>,
    pub elevation: Option<f64>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub currency: String,
    pub max_participants: Option<u32>,
    pub booking_url: Option<String>,
    pub website_url: Option<String>,
    pub amenities: Vec<String>,
    pub included: Vec<String>,
    pub not_included: Vec<String>,
    pub languages: Vec<String>,
    pub cover_image: Option<String>,
    pub images: Vec<String>,
    pub source_url: Option<String>,
}

/// Replacement booking/website links for an existing event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkUpdate {
    pub booking_url: Option<String>,
    pub website_url: Option<String>,
}

impl LinkUpdate {
    /// Normalizes empty strings to null and rejects anything that is not an http(s) URL.
    pub fn validate(self) -> Result<LinkUpdate> {
        let mut issues = Vec::new();
        let booking_url = optional_url("bookingUrl", self.booking_url, &mut issues);
        let website_url = optional_url("websiteUrl", self.website_url, &mut issues);
        if !issues.is_empty() {
            return Err(EventsError::Validation(issues.join("; ")));
        }
        Ok(LinkUpdate {
            booking_url,
            website_url,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn optional_url(field: &str, value: Option<String>, issues: &mut Vec<String>) -> Option<String> {
    let value = non_blank(value)?;
    match Url::parse(&value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(value),
        _ => {
            issues.push(format!("{field} must be a valid http(s) URL"));
            None
        }
    }
}

fn check_length(field: &str, value: &str, min: usize, max: usize, issues: &mut Vec<String>) {
    let len = value.chars().count();
    if len < min {
        issues.push(format!("{field} must be at least {min} characters"));
    } else if len > max {
        issues.push(format!("{field} must be at most {max} characters"));
    }
}

fn check_non_negative(field: &str, value: Option<f64>, issues: &mut Vec<String>) {
    if let Some(v) = value {
        if !v.is_finite() || v < 0.0 {
            issues.push(format!("{field} must be a non-negative number"));
        }
    }
}

impl EventPayload {
    /// Checks every field and reports all problems at once.
    pub fn validate(self) -> Result<NewEvent> {
        let mut issues = Vec::new();

        let title = self.title.trim().to_string();
        check_length("title", &title, 5, 100, &mut issues);
        let description = self.description.trim().to_string();
        check_length("description", &description, 50, 5000, &mut issues);

        let country = self.country.trim().to_string();
        if country.chars().count() < 2 {
            issues.push("country is required".to_string());
        }
        if self.terrain.is_empty() {
            issues.push("select at least one terrain type".to_string());
        }

        let start_date = DateInput::parse(&self.start_date).map(|d| d.start());
        if start_date.is_none() {
            issues.push(format!("startDate '{}' is not a valid date", self.start_date));
        }
        let end_date = DateInput::parse(&self.end_date).map(|d| d.start());
        if end_date.is_none() {
            issues.push(format!("endDate '{}' is not a valid date", self.end_date));
        }
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if end < start {
                issues.push("endDate must be after startDate".to_string());
            }
        }

        check_non_negative("priceMin", self.price_min, &mut issues);
        check_non_negative("priceMax", self.price_max, &mut issues);
        check_non_negative("distance", self.distance, &mut issues);
        check_non_negative("elevation", self.elevation, &mut issues);
        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            if max < min {
                issues.push("priceMax must be greater than priceMin".to_string());
            }
        }

        let max_participants = match self.max_participants {
            Some(n) if n >= 1 => u32::try_from(n).ok(),
            Some(_) => {
                issues.push("maxParticipants must be at least 1".to_string());
                None
            }
            None => None,
        };

        let booking_url = optional_url("bookingUrl", self.booking_url, &mut issues);
        let website_url = optional_url("websiteUrl", self.website_url, &mut issues);
        let source_url = optional_url("sourceUrl", self.source_url, &mut issues);

        let (Some(start_date), Some(end_date)) = (start_date, end_date) else {
            return Err(EventsError::Validation(issues.join("; ")));
        };
        if !issues.is_empty() {
            return Err(EventsError::Validation(issues.join("; ")));
        }

        let mut terrain = self.terrain;
        terrain.dedup();

        Ok(NewEvent {
            title,
            description,
            event_type: self.event_type,
            difficulty: self.difficulty,
            terrain,
            country,
            region: non_blank(self.region),
            city: non_blank(self.city),
            venue: non_blank(self.venue),
            start_date,
            end_date,
            distance: self.distance,
            elevation: self.elevation,
            price_min: self.price_min,
            price_max: self.price_max,
            currency: non_blank(self.currency).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            max_participants,
            booking_url,
            website_url,
            amenities: self.amenities,
            included: self.included,
            not_included: self.not_included,
            languages: self.languages,
            cover_image: non_blank(self.cover_image),
            images: self.images,
            source_url,
        })
    }
}

impl NewEvent {
    pub fn into_event(
        self,
        slug: String,
        source: EventSource,
        published: bool,
        user: Option<UserSummary>,
        now: DateTime<Utc>,
    ) -> Event {
        let duration = duration_days(self.start_date, self.end_date);
        Event {
            id: Uuid::new_v4(),
            slug,
            title: self.title,
            description: self.description,
            event_type: self.event_type,
            difficulty: self.difficulty,
            terrain: self.terrain,
            country: self.country,
            region: self.region,
            city: self.city,
            venue: self.venue,
            start_date: self.start_date,
            end_date: self.end_date,
            duration,
            distance: self.distance,
            elevation: self.elevation,
            price_min: self.price_min,
            price_max: self.price_max,
            currency: self.currency,
            max_participants: self.max_participants,
            current_bookings: 0,
            booking_url: self.booking_url,
            website_url: self.website_url,
            cover_image: self.cover_image,
            images: self.images,
            amenities: self.amenities,
            included: self.included,
            not_included: self.not_included,
            languages: self.languages,
            source,
            source_url: self.source_url,
            published,
            verified: false,
            featured: false,
            organizer: None,
            user,
            counts: EventCounts::default(),
            created_at: now,
            updated_at: now,
        }
    }
}
