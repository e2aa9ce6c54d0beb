use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use uuid::Uuid;

use super::{RecordStore, StoreError, BOOKING_PAIR_CONSTRAINT, EVENT_SLUG_CONSTRAINT};
use crate::models::{Booking, Event, NormalizedBooking, NormalizedEvent};

#[derive(Default)]
struct Collections {
    events: Vec<Event>,
    bookings: Vec<Booking>,
}

/// In-process store. Unique checks and writes happen under one lock, so the
/// declared constraints hold under concurrent callers just as they do in
/// Postgres.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
    event_lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of event-by-id lookups served so far.
    pub fn event_lookups(&self) -> usize {
        self.event_lookups.load(Ordering::SeqCst)
    }

    fn collections(&self) -> Result<MutexGuard<'_, Collections>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

fn conflict(constraint: &str) -> StoreError {
    StoreError::Conflict {
        constraint: constraint.to_string(),
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        self.event_lookups.fetch_add(1, Ordering::SeqCst);
        let collections = self.collections()?;
        Ok(collections.events.iter().find(|e| e.id == id).cloned())
    }

    async fn find_event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError> {
        let collections = self.collections()?;
        Ok(collections.events.iter().find(|e| e.slug == slug).cloned())
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let collections = self.collections()?;
        Ok(collections.events.iter().rev().cloned().collect())
    }

    async fn find_events_sharing_tags(
        &self,
        tags: &[String],
        excluding: Uuid,
    ) -> Result<Vec<Event>, StoreError> {
        let collections = self.collections()?;
        Ok(collections
            .events
            .iter()
            .rev()
            .filter(|e| e.id != excluding && e.details.tags.iter().any(|t| tags.contains(t)))
            .cloned()
            .collect())
    }

    async fn insert_event(&self, event: &NormalizedEvent) -> Result<Event, StoreError> {
        let mut collections = self.collections()?;
        if collections.events.iter().any(|e| e.slug == event.slug()) {
            return Err(conflict(EVENT_SLUG_CONSTRAINT));
        }

        let now = Utc::now();
        let stored = Event {
            id: Uuid::new_v4(),
            slug: event.slug().to_string(),
            details: event.details().clone(),
            created_at: now,
            updated_at: now,
        };
        collections.events.push(stored.clone());
        Ok(stored)
    }

    async fn update_event(
        &self,
        id: Uuid,
        event: &NormalizedEvent,
    ) -> Result<Option<Event>, StoreError> {
        let mut collections = self.collections()?;
        if collections
            .events
            .iter()
            .any(|e| e.id != id && e.slug == event.slug())
        {
            return Err(conflict(EVENT_SLUG_CONSTRAINT));
        }

        let Some(stored) = collections.events.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        stored.slug = event.slug().to_string();
        stored.details = event.details().clone();
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let collections = self.collections()?;
        Ok(collections.bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn find_booking_for(
        &self,
        event_id: Uuid,
        email: &str,
    ) -> Result<Option<Booking>, StoreError> {
        let collections = self.collections()?;
        Ok(collections
            .bookings
            .iter()
            .find(|b| b.event_id == event_id && b.email == email)
            .cloned())
    }

    fn bookings_for_event(&self, event_id: Uuid) -> BoxStream<'_, Result<Booking, StoreError>> {
        let snapshot: Result<Vec<Booking>, StoreError> = self.collections().map(|c| {
            c.bookings
                .iter()
                .filter(|b| b.event_id == event_id)
                .cloned()
                .collect()
        });

        match snapshot {
            Ok(bookings) => stream::iter(bookings.into_iter().map(Ok)).boxed(),
            Err(err) => stream::once(async move { Err(err) }).boxed(),
        }
    }

    async fn insert_booking(&self, booking: &NormalizedBooking) -> Result<Booking, StoreError> {
        let mut collections = self.collections()?;
        if collections
            .bookings
            .iter()
            .any(|b| b.event_id == booking.event_id() && b.email == booking.email())
        {
            return Err(conflict(BOOKING_PAIR_CONSTRAINT));
        }

        let now = Utc::now();
        let stored = Booking {
            id: Uuid::new_v4(),
            event_id: booking.event_id(),
            email: booking.email().to_string(),
            created_at: now,
            updated_at: now,
        };
        collections.bookings.push(stored.clone());
        Ok(stored)
    }

    async fn update_booking(
        &self,
        id: Uuid,
        booking: &NormalizedBooking,
    ) -> Result<Option<Booking>, StoreError> {
        let mut collections = self.collections()?;
        if collections.bookings.iter().any(|b| {
            b.id != id && b.event_id == booking.event_id() && b.email == booking.email()
        }) {
            return Err(conflict(BOOKING_PAIR_CONSTRAINT));
        }

        let Some(stored) = collections.bookings.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        stored.event_id = booking.event_id();
        stored.email = booking.email().to_string();
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::sample_draft;
    use futures::TryStreamExt;

    fn normalized_event(slug: &str) -> NormalizedEvent {
        NormalizedEvent::new(slug.to_string(), sample_draft("RustConf"))
    }

    #[tokio::test]
    async fn test_insert_event_rejects_taken_slug() {
        let store = MemoryStore::new();
        store.insert_event(&normalized_event("rustconf")).await.unwrap();

        let err = store
            .insert_event(&normalized_event("rustconf"))
            .await
            .unwrap_err();

        match err {
            StoreError::Conflict { constraint } => assert_eq!(constraint, EVENT_SLUG_CONSTRAINT),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_event_may_keep_its_own_slug() {
        let store = MemoryStore::new();
        let stored = store.insert_event(&normalized_event("rustconf")).await.unwrap();

        let updated = store
            .update_event(stored.id, &normalized_event("rustconf"))
            .await
            .unwrap();

        assert!(updated.is_some());
    }

    #[tokio::test]
    async fn test_update_unknown_event_returns_none() {
        let store = MemoryStore::new();
        let updated = store
            .update_event(Uuid::new_v4(), &normalized_event("rustconf"))
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn test_booking_pair_is_unique_and_listed_in_creation_order() {
        let store = MemoryStore::new();
        let event_id = Uuid::new_v4();
        let first = NormalizedBooking::new(event_id, "a@x.com".to_string());
        let second = NormalizedBooking::new(event_id, "b@x.com".to_string());

        store.insert_booking(&first).await.unwrap();
        store.insert_booking(&second).await.unwrap();
        let err = store.insert_booking(&first).await.unwrap_err();
        assert!(err.is_conflict());

        let emails: Vec<String> = store
            .bookings_for_event(event_id)
            .map_ok(|b| b.email)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(emails, vec!["a@x.com".to_string(), "b@x.com".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_booking_inserts_admit_exactly_one() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let booking = NormalizedBooking::new(Uuid::new_v4(), "race@x.com".to_string());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let booking = booking.clone();
                tokio::spawn(async move { store.insert_booking(&booking).await })
            })
            .collect();

        let mut successes = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(err) if err.is_conflict() => conflicts += 1,
                Err(err) => panic!("unexpected error {:?}", err),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 7);
    }
}
