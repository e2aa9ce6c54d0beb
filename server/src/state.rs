use std::sync::Arc;

use crate::records::{BookingRecordManager, EventRecordManager};
use crate::store::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub events: EventRecordManager,
    pub bookings: BookingRecordManager,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            events: EventRecordManager::new(store.clone()),
            bookings: BookingRecordManager::new(store),
        }
    }
}
