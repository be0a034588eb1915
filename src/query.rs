//! Event listing queries: parameter validation, the listing predicate and
//! pagination.
//!
//! Every listing goes through [`EventQuery`]. The stores evaluate it inside
//! the data-access layer (SQL `WHERE` for SQLite, [`EventQuery::matches`] for
//! the in-memory store), so `total` and `totalPages` only ever count events
//! that are published and carry a booking or website link.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::constants::{DEFAULT_LIMIT, DEFAULT_PAGE};
use crate::domain::{DateInput, Difficulty, Event, EventType};
use crate::error::{EventsError, Result};
use crate::metrics::QueryMetrics;
use crate::storage::EventStore;

/// Raw listing parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQueryParams {
    pub past: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub difficulty: Option<String>,
    pub country: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    /// Events starting now or later
    Upcoming,
    /// Events that already started
    Past,
}

/// A validated listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub timeframe: Timeframe,
    pub now: DateTime<Utc>,
    pub event_type: Option<EventType>,
    pub difficulty: Option<Difficulty>,
    /// Lowercased country fragment
    pub country: Option<String>,
    /// Lowercased search fragment, matched against title, description, city and region
    pub search: Option<String>,
    pub starts_from: Option<DateTime<Utc>>,
    pub ends_by: Option<DateTime<Utc>>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub page: u32,
    pub limit: u32,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_positive(field: &str, raw: &str) -> Result<u32> {
    match raw.parse::<i64>() {
        Ok(n) if n >= 1 => u32::try_from(n)
            .map_err(|_| EventsError::validation(format!("{field} is too large: {raw}"))),
        Ok(_) => Err(EventsError::validation(format!(
            "{field} must be a positive integer, got {raw}"
        ))),
        Err(_) => Err(EventsError::validation(format!(
            "{field} must be an integer, got '{raw}'"
        ))),
    }
}

fn parse_price(field: &str, raw: &str) -> Result<f64> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(EventsError::validation(format!(
            "{field} must be a non-negative number, got '{raw}'"
        ))),
    }
}

fn parse_date(field: &str, raw: &str) -> Result<DateInput> {
    DateInput::parse(raw)
        .ok_or_else(|| EventsError::validation(format!("{field} is not a valid date: '{raw}'")))
}

fn parse_past(raw: &str) -> Result<Timeframe> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(Timeframe::Past),
        "false" | "0" => Ok(Timeframe::Upcoming),
        _ => Err(EventsError::validation(format!(
            "past must be true or false, got '{raw}'"
        ))),
    }
}

impl EventQuery {
    /// First page of upcoming events with no optional filters.
    pub fn upcoming(now: DateTime<Utc>) -> Self {
        Self {
            timeframe: Timeframe::Upcoming,
            now,
            event_type: None,
            difficulty: None,
            country: None,
            search: None,
            starts_from: None,
            ends_by: None,
            min_price: None,
            max_price: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn from_params(params: &EventQueryParams, now: DateTime<Utc>) -> Result<Self> {
        Self::from_params_with_limit(params, now, DEFAULT_LIMIT)
    }

    pub fn from_params_with_limit(
        params: &EventQueryParams,
        now: DateTime<Utc>,
        default_limit: u32,
    ) -> Result<Self> {
        let mut query = Self::upcoming(now);
        query.limit = default_limit;

        if let Some(raw) = present(&params.past) {
            query.timeframe = parse_past(raw)?;
        }
        if let Some(raw) = present(&params.event_type) {
            query.event_type = Some(raw.parse().map_err(EventsError::Validation)?);
        }
        if let Some(raw) = present(&params.difficulty) {
            query.difficulty = Some(raw.parse().map_err(EventsError::Validation)?);
        }
        query.country = present(&params.country).map(str::to_lowercase);
        query.search = present(&params.search).map(str::to_lowercase);

        if let Some(raw) = present(&params.start_date) {
            query.starts_from = Some(parse_date("startDate", raw)?.start());
        }
        if let Some(raw) = present(&params.end_date) {
            query.ends_by = Some(parse_date("endDate", raw)?.end());
        }
        if let Some(raw) = present(&params.min_price) {
            query.min_price = Some(parse_price("minPrice", raw)?);
        }
        if let Some(raw) = present(&params.max_price) {
            query.max_price = Some(parse_price("maxPrice", raw)?);
        }
        if let Some(raw) = present(&params.page) {
            query.page = parse_positive("page", raw)?;
        }
        if let Some(raw) = present(&params.limit) {
            query.limit = parse_positive("limit", raw)?;
        }
        Ok(query)
    }

    /// Bounds on `startDate` as `(inclusive lower, exclusive upper)`.
    ///
    /// An explicit `startDate` narrows the past/upcoming split and never widens
    /// it: asking for past events from a future date simply matches nothing.
    pub fn start_window(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match self.timeframe {
            Timeframe::Upcoming => {
                let lower = match self.starts_from {
                    Some(from) if from > self.now => from,
                    _ => self.now,
                };
                (Some(lower), None)
            }
            Timeframe::Past => (self.starts_from, Some(self.now)),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// In-memory rendition of the listing predicate. Must agree with the SQL
    /// filter built by the SQLite store.
    pub fn matches(&self, event: &Event) -> bool {
        if !event.is_listable() {
            return false;
        }

        let (lower, upper) = self.start_window();
        if lower.is_some_and(|l| event.start_date < l) {
            return false;
        }
        if upper.is_some_and(|u| event.start_date >= u) {
            return false;
        }
        if self.ends_by.is_some_and(|e| event.end_date > e) {
            return false;
        }

        if self.event_type.is_some_and(|t| t != event.event_type) {
            return false;
        }
        if self.difficulty.is_some_and(|d| d != event.difficulty) {
            return false;
        }
        if let Some(country) = &self.country {
            if !event.country.to_lowercase().contains(country.as_str()) {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let hit = |field: Option<&str>| {
                field.is_some_and(|f| f.to_lowercase().contains(term.as_str()))
            };
            if !(hit(Some(&event.title))
                || hit(Some(&event.description))
                || hit(event.city.as_deref())
                || hit(event.region.as_deref()))
            {
                return false;
            }
        }

        if let Some(min) = self.min_price {
            if !event.price_min.is_some_and(|p| p >= min) {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if !event.price_max.is_some_and(|p| p <= max) {
                return false;
            }
        }
        true
    }
}

/// Featured events first, then by start date. Callers sort stably so equal
/// keys keep creation order.
pub fn listing_order(a: &Event, b: &Event) -> Ordering {
    b.featured
        .cmp(&a.featured)
        .then_with(|| a.start_date.cmp(&b.start_date))
}

/// One page of matching events together with the size of the full match set.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPage {
    pub events: Vec<Event>,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let limit_u64 = u64::from(limit.max(1));
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit_u64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventListing {
    pub events: Vec<Event>,
    pub pagination: Pagination,
}

pub struct EventQueryEngine {
    store: Arc<dyn EventStore>,
    default_limit: u32,
}

impl EventQueryEngine {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            default_limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    /// Validate raw parameters and run the listing.
    #[instrument(skip(self, params))]
    pub async fn list(&self, params: &EventQueryParams, now: DateTime<Utc>) -> Result<EventListing> {
        let query = EventQuery::from_params_with_limit(params, now, self.default_limit)
            .inspect_err(|e| debug!("Rejected listing parameters: {}", e))?;
        self.run(&query).await
    }

    pub async fn run(&self, query: &EventQuery) -> Result<EventListing> {
        let _timing = QueryMetrics::time_query();
        let page = match self.store.query_events(query).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Event listing failed: {}", e);
                QueryMetrics::record_error();
                return Err(e);
            }
        };
        QueryMetrics::record_query(page.events.len());
        debug!(
            "Listing page {} returned {} of {} events",
            query.page,
            page.events.len(),
            page.total
        );
        Ok(EventListing {
            pagination: Pagination::new(query.page, query.limit, page.total),
            events: page.events,
        })
    }
}
