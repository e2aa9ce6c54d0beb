//! Storage collaborator behind the record managers.
//!
//! The store owns identifiers and timestamps and enforces the unique
//! constraints declared for each collection: `events.slug` and the compound
//! `bookings.(event_id, email)`. Those constraints are the real integrity
//! guarantee. Any check a record manager performs before writing can be
//! overtaken by a concurrent writer, and the losing write surfaces here as
//! [`StoreError::Conflict`].

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Booking, Event, NormalizedBooking, NormalizedEvent};

pub mod connection;
pub mod memory;
pub mod postgres;

pub use connection::{Connect, ConnectionCache, PgConnector};
pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const EVENT_SLUG_CONSTRAINT: &str = "events_slug_key";
pub const BOOKING_PAIR_CONSTRAINT: &str = "bookings_event_id_email_key";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint '{constraint}' violated")]
    Conflict { constraint: String },

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("failed to connect to storage: {0}")]
    Connection(String),

    #[error("stored record could not be decoded: {0}")]
    Decode(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

    async fn find_event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError>;

    /// All events, newest first.
    async fn list_events(&self) -> Result<Vec<Event>, StoreError>;

    /// Events other than `excluding` that carry at least one of `tags`.
    async fn find_events_sharing_tags(
        &self,
        tags: &[String],
        excluding: Uuid,
    ) -> Result<Vec<Event>, StoreError>;

    async fn insert_event(&self, event: &NormalizedEvent) -> Result<Event, StoreError>;

    async fn update_event(
        &self,
        id: Uuid,
        event: &NormalizedEvent,
    ) -> Result<Option<Event>, StoreError>;

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn find_booking_for(
        &self,
        event_id: Uuid,
        email: &str,
    ) -> Result<Option<Booking>, StoreError>;

    /// Bookings of one event in creation order. Each call starts a fresh scan.
    fn bookings_for_event(&self, event_id: Uuid) -> BoxStream<'_, Result<Booking, StoreError>>;

    async fn insert_booking(&self, booking: &NormalizedBooking) -> Result<Booking, StoreError>;

    async fn update_booking(
        &self,
        id: Uuid,
        booking: &NormalizedBooking,
    ) -> Result<Option<Booking>, StoreError>;
}
