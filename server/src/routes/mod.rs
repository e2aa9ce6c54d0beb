use axum::{
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, Config};
use crate::handlers::bookings::{create_booking, update_booking};
use crate::handlers::events::{
    booking_status, create_event, get_event, list_event_bookings, list_events, similar_events,
    update_event,
};
use crate::handlers::health_check;
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/events", get(list_events).post(create_event))
        .route("/api/events/:slug", get(get_event).patch(update_event))
        .route("/api/events/:slug/similar", get(similar_events))
        .route("/api/events/:slug/bookings", get(list_event_bookings))
        .route("/api/events/:slug/bookings/status", get(booking_status))
        .route("/api/bookings", post(create_booking))
        .route("/api/bookings/:id", patch(update_booking))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&config.cors_allowed_origins)),
        )
}
