//! Event catalog domain types shared by the query engine, the stores and the
//! image pipeline.

pub mod payload;

pub use payload::{EventPayload, LinkUpdate, NewEvent};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::constants::SLUG_MAX_LEN;

/// Declares a closed enumeration whose wire form is its SCREAMING_SNAKE_CASE name.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($wire => Ok($name::$variant),)+
                    other => Err(format!(
                        "unknown {} '{}' (expected one of: {})",
                        stringify!($name),
                        other,
                        [$($wire),+].join(", ")
                    )),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(
    /// Kind of cycling activity being listed
    EventType {
        TrainingCamp => "TRAINING_CAMP",
        CyclingHoliday => "CYCLING_HOLIDAY",
        WeekendGetaway => "WEEKEND_GETAWAY",
        Tour => "TOUR",
        Expedition => "EXPEDITION",
    }
);

wire_enum!(Difficulty {
    Beginner => "BEGINNER",
    Intermediate => "INTERMEDIATE",
    Advanced => "ADVANCED",
    Expert => "EXPERT",
});

wire_enum!(Terrain {
    Road => "ROAD",
    Gravel => "GRAVEL",
    Mountain => "MOUNTAIN",
    Mixed => "MIXED",
});

wire_enum!(
    /// How an event entered the store
    EventSource {
        User => "USER",
        Scraped => "SCRAPED",
        Api => "API",
    }
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerSummary {
    pub id: Uuid,
    pub company_name: String,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Relation counts shipped with listings instead of the full review/saved sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCounts {
    pub reviews: u32,
    pub saved_by: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub difficulty: Difficulty,
    pub terrain: Vec<Terrain>,

    pub country: String,
    pub region: Option<String>,
    pub city: Option<String>,
    pub venue: Option<String>,

    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub duration: u32,
    pub distance: Option<f64>,
    pub elevation: Option<f64>,

    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub currency: String,
    pub max_participants: Option<u32>,
    pub current_bookings: u32,

    pub booking_url: Option<String>,
    pub website_url: Option<String>,

    pub cover_image: Option<String>,
    pub images: Vec<String>,

    pub amenities: Vec<String>,
    pub included: Vec<String>,
    pub not_included: Vec<String>,
    pub languages: Vec<String>,

    pub source: EventSource,
    pub source_url: Option<String>,
    pub published: bool,
    pub verified: bool,
    pub featured: bool,

    pub organizer: Option<OrganizerSummary>,
    pub user: Option<UserSummary>,
    #[serde(rename = "_count")]
    pub counts: EventCounts,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn has_link(&self) -> bool {
        self.booking_url.is_some() || self.website_url.is_some()
    }

    /// Visible in public listings: moderated and reachable through at least one link.
    pub fn is_listable(&self) -> bool {
        self.published && self.has_link()
    }

    pub fn needs_image(&self) -> bool {
        self.cover_image.as_deref().map_or(true, |c| c.trim().is_empty())
    }
}

/// Inclusive day count: a same-day event lasts one day.
pub fn duration_days(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let millis = (end - start).num_milliseconds().unsigned_abs();
    let day = 86_400_000u64;
    let days = (millis + day - 1) / day;
    u32::try_from(days + 1).unwrap_or(u32::MAX)
}

/// URL-safe slug: lowercase ASCII word characters joined by single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
        } else if (c.is_whitespace() || c == '-') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let trimmed = slug.trim_matches('-');
    let mut truncated: String = trimmed.chars().take(SLUG_MAX_LEN).collect();
    while truncated.ends_with('-') {
        truncated.pop();
    }
    truncated
}

/// A date supplied by a client: either a calendar day or an exact instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateInput {
    Day(NaiveDate),
    Instant(DateTime<Utc>),
}

impl DateInput {
    /// Accepts `YYYY-MM-DD`, RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS` read as UTC.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(DateInput::Day(day));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(DateInput::Instant(dt.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .map(|naive| DateInput::Instant(Utc.from_utc_datetime(&naive)))
    }

    /// Earliest instant covered
    pub fn start(&self) -> DateTime<Utc> {
        match self {
            DateInput::Day(day) => Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)),
            DateInput::Instant(dt) => *dt,
        }
    }

    /// Latest instant covered; a day covers everything up to its final millisecond.
    pub fn end(&self) -> DateTime<Utc> {
        match self {
            DateInput::Day(_) => self.start() + Duration::days(1) - Duration::milliseconds(1),
            DateInput::Instant(dt) => *dt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_strips_punctuation_and_collapses_dashes() {
        assert_eq!(slugify("Alpenbrevet 2025!"), "alpenbrevet-2025");
        assert_eq!(slugify("  Tour -- de   Suisse  "), "tour-de-suisse");
        assert_eq!(slugify("Día de Asturias"), "da-de-asturias");
    }

    #[test]
    fn slugify_truncates_long_titles() {
        let title = "a ".repeat(120);
        let slug = slugify(&title);
        assert!(slug.len() <= SLUG_MAX_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn duration_counts_both_ends() {
        let start = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(duration_days(start, start), 1);
        assert_eq!(duration_days(start, start + Duration::days(2)), 3);
        // a partial day rounds up
        assert_eq!(duration_days(start, start + Duration::hours(30)), 3);
    }

    #[test]
    fn wire_enums_parse_their_names() {
        assert_eq!("TOUR".parse::<EventType>().unwrap(), EventType::Tour);
        assert_eq!(Difficulty::Expert.as_str(), "EXPERT");
        assert!("tour".parse::<EventType>().is_err());
        assert_eq!(Terrain::ALL.len(), 4);
    }

    #[test]
    fn date_input_day_covers_whole_day() {
        let day = DateInput::parse("2026-03-10").unwrap();
        assert_eq!(day.start(), Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(
            day.end(),
            Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap() - Duration::milliseconds(1)
        );
        assert!(DateInput::parse("2026-03-10T08:00:00Z").is_some());
        assert!(DateInput::parse("10/03/2026").is_none());
    }

    #[test]
    fn event_type_serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&EventType::WeekendGetaway).unwrap();
        assert_eq!(json, "\"WEEKEND_GETAWAY\"");
    }
}
