use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::normalize::normalize_email;
use super::{Persist, RecordError};
use crate::models::{
    Booking, BookingDraft, BookingField, BookingPatch, BookingWithEvent, NormalizedBooking,
};
use crate::store::{RecordStore, StoreError};

#[derive(Clone)]
pub struct BookingRecordManager {
    store: Arc<dyn RecordStore>,
}

impl BookingRecordManager {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Verifies the referenced event and normalizes the email.
    ///
    /// The event lookup only runs on create or when `event_id` changed. The
    /// duplicate check is left to the store's unique constraint.
    pub async fn prepare(
        &self,
        candidate: BookingDraft,
        persist: Persist<'_, BookingField>,
    ) -> Result<NormalizedBooking, RecordError> {
        if persist.touches(BookingField::EventId) {
            let event = self.store.find_event(candidate.event_id).await?;
            if event.is_none() {
                debug!(event_id = %candidate.event_id, "Booking references unknown event");
                return Err(RecordError::EventNotFound(candidate.event_id));
            }
        }

        let email = if persist.touches(BookingField::Email) {
            normalize_email(&candidate.email)?
        } else {
            candidate.email
        };

        Ok(NormalizedBooking::new(candidate.event_id, email))
    }

    pub async fn create(&self, draft: BookingDraft) -> Result<Booking, RecordError> {
        let normalized = self.prepare(draft, Persist::Create).await?;
        self.store_prepared(&normalized).await
    }

    /// Writes an already prepared booking. A booking for the same
    /// (event, email) pair written in the meantime makes this fail with
    /// [`RecordError::DuplicateBooking`].
    pub async fn store_prepared(&self, booking: &NormalizedBooking) -> Result<Booking, RecordError> {
        let stored = self
            .store
            .insert_booking(booking)
            .await
            .map_err(|e| pair_conflict(e, booking))?;

        info!(booking_id = %stored.id, event_id = %stored.event_id, "Booking created");
        Ok(stored)
    }

    pub async fn update(&self, id: Uuid, patch: BookingPatch) -> Result<Booking, RecordError> {
        let existing = self
            .store
            .find_booking(id)
            .await?
            .ok_or(RecordError::RecordNotFound(id))?;

        let mut draft = existing.draft();
        let changed = patch.apply_to(&mut draft);
        debug!(booking_id = %id, ?changed, "Applying booking patch");

        let normalized = self.prepare(draft, Persist::Update(&changed)).await?;

        let stored = self
            .store
            .update_booking(id, &normalized)
            .await
            .map_err(|e| pair_conflict(e, &normalized))?
            .ok_or(RecordError::RecordNotFound(id))?;

        info!(booking_id = %stored.id, event_id = %stored.event_id, "Booking updated");
        Ok(stored)
    }

    /// Bookings of an event in creation order, each carrying the event's
    /// display fields. Every call starts a new scan of the store.
    pub async fn list_by_event(
        &self,
        event_id: Uuid,
    ) -> Result<BoxStream<'_, Result<BookingWithEvent, RecordError>>, RecordError> {
        let summary = self.store.find_event(event_id).await?.map(|e| e.summary());
        if summary.is_none() {
            warn!(event_id = %event_id, "Listing bookings of a missing event");
        }

        Ok(self
            .store
            .bookings_for_event(event_id)
            .map_ok(move |booking| BookingWithEvent {
                booking,
                event: summary.clone(),
            })
            .map_err(RecordError::from)
            .boxed())
    }

    pub async fn has_booked(&self, event_id: Uuid, email: &str) -> Result<bool, RecordError> {
        let email = email.trim().to_lowercase();
        Ok(self.store.find_booking_for(event_id, &email).await?.is_some())
    }
}

fn pair_conflict(err: StoreError, booking: &NormalizedBooking) -> RecordError {
    if err.is_conflict() {
        warn!(event_id = %booking.event_id(), email = %booking.email(), "Duplicate booking rejected");
        RecordError::DuplicateBooking {
            event_id: booking.event_id(),
            email: booking.email().to_string(),
        }
    } else {
        RecordError::StorageFailure(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::sample_draft;
    use crate::records::EventRecordManager;
    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        bookings: BookingRecordManager,
        event_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let events = EventRecordManager::new(store.clone());
        let event = events.create(sample_draft("RustConf")).await.unwrap();
        Fixture {
            bookings: BookingRecordManager::new(store.clone()),
            store,
            event_id: event.id,
        }
    }

    fn draft(event_id: Uuid, email: &str) -> BookingDraft {
        BookingDraft {
            event_id,
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_email() {
        let fx = fixture().await;
        let booking = fx
            .bookings
            .create(draft(fx.event_id, "  Ada@Example.COM "))
            .await
            .unwrap();
        assert_eq!(booking.email, "ada@example.com");
        assert_eq!(booking.event_id, fx.event_id);
    }

    #[tokio::test]
    async fn test_create_for_unknown_event_fails() {
        let fx = fixture().await;
        let missing = Uuid::new_v4();
        let err = fx
            .bookings
            .create(draft(missing, "ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordError::EventNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_email() {
        let fx = fixture().await;
        let err = fx
            .bookings
            .create(draft(fx.event_id, "not-an-email"))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordError::InvalidEmailFormat(_)));
    }

    #[tokio::test]
    async fn test_duplicate_booking_is_case_insensitive() {
        let fx = fixture().await;
        fx.bookings.create(draft(fx.event_id, "A@X.com")).await.unwrap();

        let err = fx
            .bookings
            .create(draft(fx.event_id, "a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordError::DuplicateBooking { email, .. } if email == "a@x.com"));
    }

    #[tokio::test]
    async fn test_prepared_bookings_race_and_store_rejects_loser() {
        let fx = fixture().await;
        let first = fx
            .bookings
            .prepare(draft(fx.event_id, "race@x.com"), Persist::Create)
            .await
            .unwrap();
        let second = fx
            .bookings
            .prepare(draft(fx.event_id, "RACE@x.com"), Persist::Create)
            .await
            .unwrap();

        fx.bookings.store_prepared(&first).await.unwrap();
        let err = fx.bookings.store_prepared(&second).await.unwrap_err();
        assert!(matches!(err, RecordError::DuplicateBooking { .. }));
    }

    #[tokio::test]
    async fn test_has_booked_flips_after_create() {
        let fx = fixture().await;
        assert!(!fx
            .bookings
            .has_booked(fx.event_id, "user@example.com")
            .await
            .unwrap());

        fx.bookings
            .create(draft(fx.event_id, "user@example.com"))
            .await
            .unwrap();

        assert!(fx
            .bookings
            .has_booked(fx.event_id, "User@Example.com ")
            .await
            .unwrap());
        assert!(!fx
            .bookings
            .has_booked(Uuid::new_v4(), "user@example.com")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_email_update_skips_event_lookup() {
        let fx = fixture().await;
        let booking = fx
            .bookings
            .create(draft(fx.event_id, "old@example.com"))
            .await
            .unwrap();
        let lookups = fx.store.event_lookups();

        let patch = BookingPatch {
            email: Some("New@Example.com".to_string()),
            ..BookingPatch::default()
        };
        let updated = fx.bookings.update(booking.id, patch).await.unwrap();

        assert_eq!(updated.email, "new@example.com");
        assert_eq!(fx.store.event_lookups(), lookups);
    }

    #[tokio::test]
    async fn test_event_change_is_reverified() {
        let fx = fixture().await;
        let booking = fx
            .bookings
            .create(draft(fx.event_id, "ada@example.com"))
            .await
            .unwrap();

        let missing = Uuid::new_v4();
        let patch = BookingPatch {
            event_id: Some(missing),
            ..BookingPatch::default()
        };
        let err = fx.bookings.update(booking.id, patch).await.unwrap_err();
        assert!(matches!(err, RecordError::EventNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_update_unknown_booking() {
        let fx = fixture().await;
        let id = Uuid::new_v4();
        let err = fx
            .bookings
            .update(id, BookingPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RecordError::RecordNotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_list_by_event_attaches_event_summary_and_restarts() {
        let fx = fixture().await;
        for email in ["a@x.com", "b@x.com"] {
            fx.bookings.create(draft(fx.event_id, email)).await.unwrap();
        }

        for _ in 0..2 {
            let listed: Vec<BookingWithEvent> = fx
                .bookings
                .list_by_event(fx.event_id)
                .await
                .unwrap()
                .try_collect()
                .await
                .unwrap();

            assert_eq!(listed.len(), 2);
            assert_eq!(listed[0].booking.email, "a@x.com");
            let summary = listed[0].event.as_ref().unwrap();
            assert_eq!(summary.title, "RustConf");
            assert_eq!(summary.date, "2025-03-15");
            assert_eq!(summary.venue, "Moscone Center");
        }
    }

    #[tokio::test]
    async fn test_list_by_missing_event_is_empty() {
        let fx = fixture().await;
        let listed: Vec<BookingWithEvent> = fx
            .bookings
            .list_by_event(Uuid::new_v4())
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert!(listed.is_empty());
    }
}
