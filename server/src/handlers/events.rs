use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::models::{BookingWithEvent, Event, EventDraft, EventPatch};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct BookingStatusQuery {
    pub email: String,
}

#[derive(Serialize)]
struct BookingStatus {
    booked: bool,
}

async fn event_by_slug(state: &AppState, slug: &str) -> Result<Event, AppError> {
    state
        .events
        .find_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event '{}' was not found", slug)))
}

pub async fn list_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.events.list().await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn create_event(
    State(state): State<AppState>,
    payload: Result<Json<EventDraft>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(draft) = payload?;
    let event = state.events.create(draft).await?;
    Ok(created(event, "Event created"))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let event = event_by_slug(&state, &slug).await?;
    Ok(success(event, "Event retrieved"))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    payload: Result<Json<EventPatch>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(patch) = payload?;
    let existing = event_by_slug(&state, &slug).await?;
    let event = state.events.update(existing.id, patch).await?;
    Ok(success(event, "Event updated"))
}

pub async fn similar_events(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let events = state.events.similar_to(&slug).await?;
    Ok(success(events, "Similar events retrieved"))
}

pub async fn list_event_bookings(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let event = event_by_slug(&state, &slug).await?;
    let bookings: Vec<BookingWithEvent> = state
        .bookings
        .list_by_event(event.id)
        .await?
        .try_collect()
        .await?;
    Ok(success(bookings, "Bookings retrieved"))
}

pub async fn booking_status(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    query: Result<Query<BookingStatusQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query?;
    let event = event_by_slug(&state, &slug).await?;
    let booked = state.bookings.has_booked(event.id, &query.email).await?;
    Ok(success(BookingStatus { booked }, "Booking status retrieved"))
}
