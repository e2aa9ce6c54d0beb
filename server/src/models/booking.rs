use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::event::EventSummary;

/// Caller-supplied booking request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub event_id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingField {
    EventId,
    Email,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPatch {
    pub event_id: Option<Uuid>,
    pub email: Option<String>,
}

impl BookingPatch {
    pub fn apply_to(self, draft: &mut BookingDraft) -> Vec<BookingField> {
        let mut changed = Vec::new();
        if let Some(event_id) = self.event_id {
            if draft.event_id != event_id {
                draft.event_id = event_id;
                changed.push(BookingField::EventId);
            }
        }
        if let Some(email) = self.email {
            if draft.email != email {
                draft.email = email;
                changed.push(BookingField::Email);
            }
        }
        changed
    }
}

/// A booking whose event reference was verified and whose email is
/// trimmed, lowercased and well formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBooking {
    event_id: Uuid,
    email: String,
}

impl NormalizedBooking {
    pub(crate) fn new(event_id: Uuid, email: String) -> Self {
        Self { event_id, email }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub event_id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn draft(&self) -> BookingDraft {
        BookingDraft {
            event_id: self.event_id,
            email: self.email.clone(),
        }
    }
}

/// A booking together with the display fields of the event it references.
/// `event` is `None` when the referenced event no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingWithEvent {
    #[serde(flatten)]
    pub booking: Booking,
    pub event: Option<EventSummary>,
}
