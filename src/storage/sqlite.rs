use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use super::{EventStore, ImageStats, ImageTarget};
use crate::domain::{Event, EventCounts, LinkUpdate};
use crate::error::{EventsError, Result};
use crate::query::{EventPage, EventQuery};

const SCHEMA: &str = r#"
    PRAGMA journal_mode=WAL;
    CREATE TABLE IF NOT EXISTS events (
        seq               INTEGER PRIMARY KEY AUTOINCREMENT,
        id                TEXT NOT NULL UNIQUE,
        slug              TEXT NOT NULL UNIQUE,
        title             TEXT NOT NULL,
        description       TEXT NOT NULL,
        event_type        TEXT NOT NULL,
        difficulty        TEXT NOT NULL,
        terrain           TEXT NOT NULL DEFAULT '[]',
        country           TEXT NOT NULL,
        region            TEXT,
        city              TEXT,
        venue             TEXT,
        start_ms          INTEGER NOT NULL,
        end_ms            INTEGER NOT NULL,
        duration          INTEGER NOT NULL,
        distance          REAL,
        elevation         REAL,
        price_min         REAL,
        price_max         REAL,
        currency          TEXT NOT NULL DEFAULT 'EUR',
        max_participants  INTEGER,
        current_bookings  INTEGER NOT NULL DEFAULT 0,
        booking_url       TEXT,
        website_url       TEXT,
        cover_image       TEXT,
        images            TEXT NOT NULL DEFAULT '[]',
        amenities         TEXT NOT NULL DEFAULT '[]',
        included          TEXT NOT NULL DEFAULT '[]',
        not_included      TEXT NOT NULL DEFAULT '[]',
        languages         TEXT NOT NULL DEFAULT '[]',
        source            TEXT NOT NULL,
        source_url        TEXT,
        published         INTEGER NOT NULL DEFAULT 0,
        verified          INTEGER NOT NULL DEFAULT 0,
        featured          INTEGER NOT NULL DEFAULT 0,
        organizer         TEXT,
        user_summary      TEXT,
        review_count      INTEGER NOT NULL DEFAULT 0,
        saved_count       INTEGER NOT NULL DEFAULT 0,
        created_ms        INTEGER NOT NULL,
        updated_ms        INTEGER NOT NULL,
        title_lc          TEXT NOT NULL,
        description_lc    TEXT NOT NULL,
        country_lc        TEXT NOT NULL,
        region_lc         TEXT,
        city_lc           TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_events_listing ON events (published, featured, start_ms);
    CREATE INDEX IF NOT EXISTS idx_events_title_start ON events (title, start_ms);
"#;

const COLUMNS: &str = "id, slug, title, description, event_type, difficulty, terrain, country, \
    region, city, venue, start_ms, end_ms, duration, distance, elevation, price_min, price_max, \
    currency, max_participants, current_bookings, booking_url, website_url, cover_image, images, \
    amenities, included, not_included, languages, source, source_url, published, verified, \
    featured, organizer, user_summary, review_count, saved_count, created_ms, updated_ms";

/// Unicode-lowercased copies of the searchable text. SQLite's `LOWER()` only
/// folds ASCII, so case-insensitive matching runs against these instead.
const FOLDED_COLUMNS: &str = "title_lc, description_lc, country_lc, region_lc, city_lc";

/// The listing predicate. Rows without a booking or website link, and
/// unpublished rows, are excluded before any optional filter.
const LISTABLE: &str = "published = 1 AND (booking_url IS NOT NULL OR website_url IS NOT NULL)";

/// SQLite-backed store. Listing filters are compiled to SQL so unmatched rows
/// are never loaded.
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
}

impl SqliteEventStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| EventsError::data_access("event store connection lock poisoned"))
    }

    fn select_where(
        conn: &Connection,
        where_sql: &str,
        params: &[Value],
    ) -> Result<Vec<Event>> {
        let sql = format!("SELECT {COLUMNS} FROM events WHERE {where_sql} ORDER BY seq");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), row_to_event)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

/// `WHERE` clause fragments plus their positional parameters.
struct SqlFilter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl SqlFilter {
    fn push(&mut self, clause: &str, values: impl IntoIterator<Item = Value>) {
        self.clauses.push(clause.to_string());
        self.params.extend(values);
    }

    fn where_sql(&self) -> String {
        self.clauses.join(" AND ")
    }
}

fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn listing_filter(query: &EventQuery) -> SqlFilter {
    let mut filter = SqlFilter {
        clauses: vec![LISTABLE.to_string()],
        params: Vec::new(),
    };

    let (lower, upper) = query.start_window();
    if let Some(lower) = lower {
        filter.push("start_ms >= ?", [Value::Integer(lower.timestamp_millis())]);
    }
    if let Some(upper) = upper {
        filter.push("start_ms < ?", [Value::Integer(upper.timestamp_millis())]);
    }
    if let Some(ends_by) = query.ends_by {
        filter.push("end_ms <= ?", [Value::Integer(ends_by.timestamp_millis())]);
    }
    if let Some(event_type) = query.event_type {
        filter.push("event_type = ?", [Value::Text(event_type.as_str().into())]);
    }
    if let Some(difficulty) = query.difficulty {
        filter.push("difficulty = ?", [Value::Text(difficulty.as_str().into())]);
    }
    if let Some(country) = &query.country {
        filter.push(
            "country_lc LIKE ? ESCAPE '\\'",
            [Value::Text(like_pattern(country))],
        );
    }
    if let Some(search) = &query.search {
        let pattern = Value::Text(like_pattern(search));
        filter.push(
            "(title_lc LIKE ? ESCAPE '\\' OR description_lc LIKE ? ESCAPE '\\' \
             OR city_lc LIKE ? ESCAPE '\\' OR region_lc LIKE ? ESCAPE '\\')",
            std::iter::repeat(pattern).take(4),
        );
    }
    if let Some(min) = query.min_price {
        filter.push("price_min >= ?", [Value::Real(min)]);
    }
    if let Some(max) = query.max_price {
        filter.push("price_max <= ?", [Value::Real(max)]);
    }
    filter
}

fn conversion_error(row: &Row<'_>, column: &str, message: String) -> rusqlite::Error {
    let idx = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn parse_col<T: FromStr>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T::Err: std::fmt::Display,
{
    let raw: String = row.get(column)?;
    raw.parse()
        .map_err(|e: T::Err| conversion_error(row, column, format!("{column}: {e}")))
}

fn json_col<T: DeserializeOwned>(row: &Row<'_>, column: &str) -> rusqlite::Result<T> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(row, column, format!("{column}: {e}")))
}

fn optional_json_col<T: DeserializeOwned>(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|r| {
        serde_json::from_str(&r).map_err(|e| conversion_error(row, column, format!("{column}: {e}")))
    })
    .transpose()
}

fn millis_col(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(column)?;
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| conversion_error(row, column, format!("{column}: timestamp {ms} out of range")))
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: parse_col::<Uuid>(row, "id")?,
        slug: row.get("slug")?,
        title: row.get("title")?,
        description: row.get("description")?,
        event_type: parse_col(row, "event_type")?,
        difficulty: parse_col(row, "difficulty")?,
        terrain: json_col(row, "terrain")?,
        country: row.get("country")?,
        region: row.get("region")?,
        city: row.get("city")?,
        venue: row.get("venue")?,
        start_date: millis_col(row, "start_ms")?,
        end_date: millis_col(row, "end_ms")?,
        duration: row.get("duration")?,
        distance: row.get("distance")?,
        elevation: row.get("elevation")?,
        price_min: row.get("price_min")?,
        price_max: row.get("price_max")?,
        currency: row.get("currency")?,
        max_participants: row.get("max_participants")?,
        current_bookings: row.get("current_bookings")?,
        booking_url: row.get("booking_url")?,
        website_url: row.get("website_url")?,
        cover_image: row.get("cover_image")?,
        images: json_col(row, "images")?,
        amenities: json_col(row, "amenities")?,
        included: json_col(row, "included")?,
        not_included: json_col(row, "not_included")?,
        languages: json_col(row, "languages")?,
        source: parse_col(row, "source")?,
        source_url: row.get("source_url")?,
        published: row.get("published")?,
        verified: row.get("verified")?,
        featured: row.get("featured")?,
        organizer: optional_json_col(row, "organizer")?,
        user: optional_json_col(row, "user_summary")?,
        counts: EventCounts {
            reviews: row.get("review_count")?,
            saved_by: row.get("saved_count")?,
        },
        created_at: millis_col(row, "created_ms")?,
        updated_at: millis_col(row, "updated_ms")?,
    })
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation)
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn query_events(&self, query: &EventQuery) -> Result<EventPage> {
        let filter = listing_filter(query);
        let where_sql = filter.where_sql();
        let conn = self.conn()?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM events WHERE {where_sql}"),
            params_from_iter(filter.params.iter()),
            |row| row.get(0),
        )?;

        let page_sql = format!(
            "SELECT {COLUMNS} FROM events WHERE {where_sql} \
             ORDER BY featured DESC, start_ms ASC, seq ASC LIMIT ? OFFSET ?"
        );
        let mut page_params = filter.params.clone();
        page_params.push(Value::Integer(i64::from(query.limit)));
        page_params.push(Value::Integer(
            i64::try_from(query.offset()).unwrap_or(i64::MAX),
        ));

        let mut stmt = conn.prepare(&page_sql)?;
        let rows = stmt.query_map(params_from_iter(page_params.iter()), row_to_event)?;
        let events = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        debug!("SQL listing matched {} rows", total);

        Ok(EventPage {
            events,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn get_event_by_slug(&self, slug: &str) -> Result<Option<Event>> {
        let conn = self.conn()?;
        let mut events = Self::select_where(&conn, "slug = ?", &[Value::Text(slug.to_string())])?;
        Ok(events.pop())
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT 1 FROM events WHERE slug = ?1")?;
        Ok(stmt.exists(params![slug])?)
    }

    async fn find_duplicate(
        &self,
        slug: &str,
        title: &str,
        start_date: DateTime<Utc>,
    ) -> Result<Option<Event>> {
        let conn = self.conn()?;
        let mut events = Self::select_where(
            &conn,
            "slug = ? OR (title = ? AND start_ms = ?)",
            &[
                Value::Text(slug.to_string()),
                Value::Text(title.to_string()),
                Value::Integer(start_date.timestamp_millis()),
            ],
        )?;
        Ok(if events.is_empty() {
            None
        } else {
            Some(events.remove(0))
        })
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        let terrain = serde_json::to_string(&event.terrain)?;
        let images = serde_json::to_string(&event.images)?;
        let amenities = serde_json::to_string(&event.amenities)?;
        let included = serde_json::to_string(&event.included)?;
        let not_included = serde_json::to_string(&event.not_included)?;
        let languages = serde_json::to_string(&event.languages)?;
        let organizer = event.organizer.as_ref().map(serde_json::to_string).transpose()?;
        let user = event.user.as_ref().map(serde_json::to_string).transpose()?;

        let conn = self.conn()?;
        let inserted = conn.execute(
            &format!(
                "INSERT INTO events ({COLUMNS}, {FOLDED_COLUMNS}) VALUES (\
                 ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, \
                 ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31, ?32, ?33, ?34, ?35, ?36, ?37, ?38, ?39, ?40, \
                 ?41, ?42, ?43, ?44, ?45)"
            ),
            params![
                event.id.to_string(),
                event.slug,
                event.title,
                event.description,
                event.event_type.as_str(),
                event.difficulty.as_str(),
                terrain,
                event.country,
                event.region,
                event.city,
                event.venue,
                event.start_date.timestamp_millis(),
                event.end_date.timestamp_millis(),
                event.duration,
                event.distance,
                event.elevation,
                event.price_min,
                event.price_max,
                event.currency,
                event.max_participants,
                event.current_bookings,
                event.booking_url,
                event.website_url,
                event.cover_image,
                images,
                amenities,
                included,
                not_included,
                languages,
                event.source.as_str(),
                event.source_url,
                event.published,
                event.verified,
                event.featured,
                organizer,
                user,
                event.counts.reviews,
                event.counts.saved_by,
                event.created_at.timestamp_millis(),
                event.updated_at.timestamp_millis(),
                event.title.to_lowercase(),
                event.description.to_lowercase(),
                event.country.to_lowercase(),
                event.region.as_deref().map(str::to_lowercase),
                event.city.as_deref().map(str::to_lowercase),
            ],
        );
        match inserted {
            Ok(_) => {
                debug!("Created event: {} with id {}", event.title, event.id);
                Ok(())
            }
            Err(e) if is_constraint_violation(&e) => Err(EventsError::validation(format!(
                "slug '{}' is already taken",
                event.slug
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_published(&self, slug: &str, published: bool) -> Result<Option<Event>> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE events SET published = ?1, updated_ms = ?2 WHERE slug = ?3",
            params![published, Utc::now().timestamp_millis(), slug],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        let mut events = Self::select_where(&conn, "slug = ?", &[Value::Text(slug.to_string())])?;
        Ok(events.pop())
    }

    async fn update_links(&self, slug: &str, links: &LinkUpdate) -> Result<Option<Event>> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE events SET booking_url = COALESCE(?1, booking_url), \
             website_url = COALESCE(?2, website_url), updated_ms = ?3 WHERE slug = ?4",
            params![
                links.booking_url,
                links.website_url,
                Utc::now().timestamp_millis(),
                slug
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        let mut events = Self::select_where(&conn, "slug = ?", &[Value::Text(slug.to_string())])?;
        Ok(events.pop())
    }

    async fn update_images(&self, id: Uuid, cover_image: &str, images: &[String]) -> Result<()> {
        let images = serde_json::to_string(images)?;
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE events SET cover_image = ?1, images = ?2, updated_ms = ?3 WHERE id = ?4",
            params![cover_image, images, Utc::now().timestamp_millis(), id.to_string()],
        )?;
        if changed == 0 {
            return Err(EventsError::NotFound(format!("event {id}")));
        }
        debug!("Updated images for event {}", id);
        Ok(())
    }

    async fn events_missing_images(&self) -> Result<Vec<ImageTarget>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, event_type, country, source_url FROM events \
             WHERE cover_image IS NULL OR TRIM(cover_image) = '' ORDER BY seq",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ImageTarget {
                id: parse_col(row, "id")?,
                title: row.get("title")?,
                event_type: parse_col(row, "event_type")?,
                country: row.get("country")?,
                source_url: row.get("source_url")?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn image_stats(&self) -> Result<ImageStats> {
        let conn = self.conn()?;
        let (total, with_images): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), \
             COALESCE(SUM(CASE WHEN cover_image IS NOT NULL AND TRIM(cover_image) != '' THEN 1 ELSE 0 END), 0) \
             FROM events",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(ImageStats::new(
            u64::try_from(total).unwrap_or(0),
            u64::try_from(with_images).unwrap_or(0),
        ))
    }

    async fn events_without_links(&self) -> Result<Vec<Event>> {
        let conn = self.conn()?;
        Self::select_where(&conn, "booking_url IS NULL AND website_url IS NULL", &[])
    }

    async fn delete_events_without_links(&self) -> Result<u64> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM events WHERE booking_url IS NULL AND website_url IS NULL",
            [],
        )?;
        Ok(deleted as u64)
    }

    async fn count_published(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM events WHERE published = 1", [], |row| {
                row.get(0)
            })?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventType, OrganizerSummary};
    use crate::storage::InMemoryEventStore;
    use crate::test_support::sample_event;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
    }

    fn catalog() -> Vec<Event> {
        let mut events = Vec::new();
        for (i, title) in [
            "Stelvio Climbing Camp",
            "Tuscany Gravel Week",
            "Sardinia Coastal Tour",
            "Mallorca Winter Miles",
            "Pyrenees Expedition",
        ]
        .iter()
        .enumerate()
        {
            events.push(sample_event(title, now() + Duration::days(10 * (i as i64 + 1))));
        }
        events[3].featured = true;
        events[3].country = "Spain".into();
        events[4].event_type = EventType::Expedition;
        events[4].price_min = None;
        events[1].region = Some("Toscana_Sud".into());

        let mut unlisted = sample_event("Hidden Ride", now() + Duration::days(2));
        unlisted.booking_url = None;
        events.push(unlisted);

        let mut draft = sample_event("Draft Camp", now() + Duration::days(3));
        draft.published = false;
        events.push(draft);

        let mut past = sample_event("Last Spring Classic", now() - Duration::days(20));
        past.website_url = Some("https://classic.example.com".into());
        events.push(past);
        events
    }

    async fn seeded() -> SqliteEventStore {
        let store = SqliteEventStore::open_in_memory().unwrap();
        for event in catalog() {
            store.insert_event(&event).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn round_trips_every_column() {
        let store = SqliteEventStore::open_in_memory().unwrap();
        let mut event = sample_event("Alpenbrevet", now() + Duration::days(30));
        event.organizer = Some(OrganizerSummary {
            id: Uuid::new_v4(),
            company_name: "Alpine Rides AG".into(),
            verified: true,
        });
        event.images = vec!["https://img.example.com/a.jpg".into()];
        event.region = Some("Alps".into());
        store.insert_event(&event).await.unwrap();

        let loaded = store.get_event_by_slug(&event.slug).await.unwrap().unwrap();
        assert_eq!(loaded, event);
    }

    #[tokio::test]
    async fn orders_featured_first_then_by_start_date() {
        let store = seeded().await;
        let mut query = EventQuery::upcoming(now());
        query.limit = 3;
        let page = store.query_events(&query).await.unwrap();

        assert_eq!(page.total, 5);
        let titles: Vec<_> = page.events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(
            titles,
            ["Mallorca Winter Miles", "Stelvio Climbing Camp", "Tuscany Gravel Week"]
        );
    }

    #[tokio::test]
    async fn like_wildcards_in_search_terms_are_literal() {
        let store = seeded().await;
        let mut query = EventQuery::upcoming(now());
        query.search = Some("_sud".into());
        let page = store.query_events(&query).await.unwrap();
        assert_eq!(page.total, 1);

        query.search = Some("%".into());
        assert_eq!(store.query_events(&query).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn agrees_with_the_in_memory_store() {
        let sqlite = seeded().await;
        let memory = InMemoryEventStore::with_events(catalog());

        let mut queries = vec![EventQuery::upcoming(now())];
        let mut past = EventQuery::upcoming(now());
        past.timeframe = crate::query::Timeframe::Past;
        queries.push(past);
        let mut spain = EventQuery::upcoming(now());
        spain.country = Some("spa".into());
        queries.push(spain);
        let mut priced = EventQuery::upcoming(now());
        priced.min_price = Some(100.0);
        priced.max_price = Some(1000.0);
        queries.push(priced);
        let mut expeditions = EventQuery::upcoming(now());
        expeditions.event_type = Some(EventType::Expedition);
        queries.push(expeditions);
        let mut austria = EventQuery::upcoming(now());
        austria.country = Some("österreich".into());
        queries.push(austria);
        let mut ile = EventQuery::upcoming(now());
        ile.search = Some("île".into());
        queries.push(ile);
        let mut second_page = EventQuery::upcoming(now());
        second_page.limit = 2;
        second_page.page = 2;
        queries.push(second_page);

        let mut alpine = sample_event("Großglockner Weekend", now() + Duration::days(12));
        alpine.country = "Österreich".into();
        alpine.region = Some("Île-de-France".into());
        sqlite.insert_event(&alpine).await.unwrap();
        memory.insert_event(&alpine).await.unwrap();

        for query in queries {
            let a = sqlite.query_events(&query).await.unwrap();
            let b = memory.query_events(&query).await.unwrap();
            assert_eq!(a.total, b.total, "{query:?}");
            if query.country.is_some() || query.search.is_some() {
                assert!(a.total >= 1, "{query:?}");
            }
            let slugs_a: Vec<_> = a.events.iter().map(|e| e.slug.clone()).collect();
            let slugs_b: Vec<_> = b.events.iter().map(|e| e.slug.clone()).collect();
            assert_eq!(slugs_a, slugs_b, "{query:?}");
        }
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_validation_error() {
        let store = seeded().await;
        let clash = sample_event("Stelvio Climbing Camp", now());
        assert!(matches!(
            store.insert_event(&clash).await,
            Err(EventsError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn image_backfill_queries() {
        let store = seeded().await;
        let missing = store.events_missing_images().await.unwrap();
        assert_eq!(missing.len(), 8);

        let target = &missing[0];
        store
            .update_images(target.id, "https://img.example.com/c.jpg", &["https://img.example.com/c.jpg".into()])
            .await
            .unwrap();
        let stats = store.image_stats().await.unwrap();
        assert_eq!((stats.total_events, stats.events_with_images), (8, 1));
    }

    #[tokio::test]
    async fn cleanup_and_moderation() {
        let store = seeded().await;
        assert_eq!(store.events_without_links().await.unwrap().len(), 1);
        assert_eq!(store.delete_events_without_links().await.unwrap(), 1);
        assert_eq!(store.count_published().await.unwrap(), 6);

        let published = store.set_published("draft-camp", true).await.unwrap().unwrap();
        assert!(published.published);
        assert!(store.set_published("no-such-event", true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_backed_store_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("events.db");
        {
            let store = SqliteEventStore::open(&path).unwrap();
            store
                .insert_event(&sample_event("Gran Fondo Roma", now() + Duration::days(4)))
                .await
                .unwrap();
        }
        let reopened = SqliteEventStore::open(&path).unwrap();
        assert!(reopened.slug_exists("gran-fondo-roma").await.unwrap());
    }
}
