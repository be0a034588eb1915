#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use cycling_events::domain::{Event, EventType};

// The shared fixtures resolve their imports through this module.
pub use cycling_events::{app, domain};

#[path = "../../src/test_support.rs"]
mod support;

pub use support::{sample_event, StubHttp};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

/// Published, bookable French holiday starting `days` after `now()`.
pub fn event(title: &str, days: i64) -> Event {
    let start = now() + Duration::days(days);
    let mut event = sample_event(title, start);
    event.event_type = EventType::CyclingHoliday;
    event.country = "France".into();
    event.end_date = start + Duration::days(4);
    event.duration = 5;
    event.created_at = now() - Duration::days(30);
    event.updated_at = event.created_at;
    event
}
