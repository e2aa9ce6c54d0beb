use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{RecordStore, StoreError};
use crate::models::{Booking, Event, EventDraft, NormalizedBooking, NormalizedEvent};

const EVENT_COLUMNS: &str = r#"id, slug, title, description, overview, image, venue, location,
    "date", "time", mode, audience, agenda, organizer, tags, created_at, updated_at"#;

const BOOKING_COLUMNS: &str = "id, event_id, email, created_at, updated_at";

#[derive(Debug, FromRow)]
struct EventRow {
    id: Uuid,
    slug: String,
    title: String,
    description: String,
    overview: String,
    image: String,
    venue: String,
    location: String,
    date: String,
    time: String,
    mode: String,
    audience: String,
    agenda: Vec<String>,
    organizer: String,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let mode = row.mode.parse().map_err(StoreError::Decode)?;
        Ok(Event {
            id: row.id,
            slug: row.slug,
            details: EventDraft {
                title: row.title,
                description: row.description,
                overview: row.overview,
                image: row.image,
                venue: row.venue,
                location: row.location,
                date: row.date,
                time: row.time,
                mode,
                audience: row.audience,
                agenda: row.agenda,
                organizer: row.organizer,
                tags: row.tags,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres-backed store. Uniqueness lives in the schema (see `migrations/`).
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {}", e)))?;
        Ok(())
    }

    async fn fetch_events(&self, sql: &str) -> Result<Vec<Event>, StoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Event::try_from).collect()
    }
}

/// Turns a unique violation into [`StoreError::Conflict`]; everything else
/// stays a database error.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Conflict {
                constraint: db_err.constraint().unwrap_or("unknown").to_string(),
            };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl RecordStore for PgStore {
    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let sql = format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS);
        let row: Option<EventRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Event::try_from).transpose()
    }

    async fn find_event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError> {
        let sql = format!("SELECT {} FROM events WHERE slug = $1", EVENT_COLUMNS);
        let row: Option<EventRow> = sqlx::query_as(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Event::try_from).transpose()
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let sql = format!(
            "SELECT {} FROM events ORDER BY created_at DESC, id",
            EVENT_COLUMNS
        );
        self.fetch_events(&sql).await
    }

    async fn find_events_sharing_tags(
        &self,
        tags: &[String],
        excluding: Uuid,
    ) -> Result<Vec<Event>, StoreError> {
        let sql = format!(
            "SELECT {} FROM events WHERE id <> $1 AND tags && $2 ORDER BY created_at DESC, id",
            EVENT_COLUMNS
        );
        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .bind(excluding)
            .bind(tags)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Event::try_from).collect()
    }

    async fn insert_event(&self, event: &NormalizedEvent) -> Result<Event, StoreError> {
        let details = event.details();
        let sql = format!(
            r#"INSERT INTO events (id, slug, title, description, overview, image, venue, location,
                "date", "time", mode, audience, agenda, organizer, tags, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, now(), now())
            RETURNING {}"#,
            EVENT_COLUMNS
        );
        let row: EventRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(event.slug())
            .bind(&details.title)
            .bind(&details.description)
            .bind(&details.overview)
            .bind(&details.image)
            .bind(&details.venue)
            .bind(&details.location)
            .bind(&details.date)
            .bind(&details.time)
            .bind(details.mode.as_str())
            .bind(&details.audience)
            .bind(&details.agenda)
            .bind(&details.organizer)
            .bind(&details.tags)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;
        Event::try_from(row)
    }

    async fn update_event(
        &self,
        id: Uuid,
        event: &NormalizedEvent,
    ) -> Result<Option<Event>, StoreError> {
        let details = event.details();
        let sql = format!(
            r#"UPDATE events SET slug = $2, title = $3, description = $4, overview = $5,
                image = $6, venue = $7, location = $8, "date" = $9, "time" = $10, mode = $11,
                audience = $12, agenda = $13, organizer = $14, tags = $15, updated_at = now()
            WHERE id = $1
            RETURNING {}"#,
            EVENT_COLUMNS
        );
        let row: Option<EventRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(event.slug())
            .bind(&details.title)
            .bind(&details.description)
            .bind(&details.overview)
            .bind(&details.image)
            .bind(&details.venue)
            .bind(&details.location)
            .bind(&details.date)
            .bind(&details.time)
            .bind(details.mode.as_str())
            .bind(&details.audience)
            .bind(&details.agenda)
            .bind(&details.organizer)
            .bind(&details.tags)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;
        row.map(Event::try_from).transpose()
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let booking = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(booking)
    }

    async fn find_booking_for(
        &self,
        event_id: Uuid,
        email: &str,
    ) -> Result<Option<Booking>, StoreError> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE event_id = $1 AND email = $2",
            BOOKING_COLUMNS
        );
        let booking = sqlx::query_as(&sql)
            .bind(event_id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(booking)
    }

    fn bookings_for_event(&self, event_id: Uuid) -> BoxStream<'_, Result<Booking, StoreError>> {
        sqlx::query_as::<_, Booking>(
            "SELECT id, event_id, email, created_at, updated_at FROM bookings \
             WHERE event_id = $1 ORDER BY created_at, id",
        )
        .bind(event_id)
        .fetch(&self.pool)
        .map_err(StoreError::from)
        .boxed()
    }

    async fn insert_booking(&self, booking: &NormalizedBooking) -> Result<Booking, StoreError> {
        let sql = format!(
            "INSERT INTO bookings (id, event_id, email, created_at, updated_at) \
             VALUES ($1, $2, $3, now(), now()) RETURNING {}",
            BOOKING_COLUMNS
        );
        sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(booking.event_id())
            .bind(booking.email())
            .fetch_one(&self.pool)
            .await
            .map_err(classify)
    }

    async fn update_booking(
        &self,
        id: Uuid,
        booking: &NormalizedBooking,
    ) -> Result<Option<Booking>, StoreError> {
        let sql = format!(
            "UPDATE bookings SET event_id = $2, email = $3, updated_at = now() \
             WHERE id = $1 RETURNING {}",
            BOOKING_COLUMNS
        );
        sqlx::query_as(&sql)
            .bind(id)
            .bind(booking.event_id())
            .bind(booking.email())
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }
}
