//! Validation and normalization of events and bookings before they reach
//! storage.
//!
//! Persisting a record is a two-phase call: `prepare` turns a candidate into
//! a normalized record or a [`RecordError`], then the store writes it.
//! Passing `prepare` does not guarantee the write succeeds; uniqueness is
//! decided by the store and a lost race comes back as a duplicate error.

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

pub mod booking;
pub mod event;
pub mod normalize;

pub use booking::BookingRecordManager;
pub use event::EventRecordManager;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{field} must be at most {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("invalid date '{0}'")]
    InvalidDateFormat(String),

    #[error("invalid time '{0}', expected HH:MM or HH:MM AM/PM")]
    InvalidTimeFormat(String),

    #[error("{0} must contain at least one item")]
    EmptyRequiredList(&'static str),

    #[error("invalid email address '{0}'")]
    InvalidEmailFormat(String),

    #[error("event {0} does not exist")]
    EventNotFound(Uuid),

    #[error("record {0} does not exist")]
    RecordNotFound(Uuid),

    #[error("an event with slug '{0}' already exists")]
    DuplicateSlug(String),

    #[error("{email} has already booked event {event_id}")]
    DuplicateBooking { event_id: Uuid, email: String },

    #[error("storage failure")]
    StorageFailure(#[from] StoreError),
}

impl RecordError {
    /// Errors raised by validation alone, before storage is consulted.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RecordError::MissingField(_)
                | RecordError::FieldTooLong { .. }
                | RecordError::InvalidDateFormat(_)
                | RecordError::InvalidTimeFormat(_)
                | RecordError::EmptyRequiredList(_)
                | RecordError::InvalidEmailFormat(_)
        )
    }
}

/// Whether a record is being written for the first time or which of its
/// fields an update changed.
#[derive(Debug, Clone, Copy)]
pub enum Persist<'a, F> {
    Create,
    Update(&'a [F]),
}

impl<F: PartialEq> Persist<'_, F> {
    /// True when `field` has to be (re)processed: always on create, and on
    /// update only if the field changed.
    pub fn touches(&self, field: F) -> bool {
        match self {
            Persist::Create => true,
            Persist::Update(changed) => changed.contains(&field),
        }
    }
}
