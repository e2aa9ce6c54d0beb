pub mod booking;
pub mod event;

pub use booking::{Booking, BookingDraft, BookingField, BookingPatch, BookingWithEvent, NormalizedBooking};
pub use event::{
    Event, EventDraft, EventField, EventMode, EventPatch, EventSummary, NormalizedEvent,
};
