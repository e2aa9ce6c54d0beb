use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use uuid::Uuid;

use crate::models::{BookingDraft, BookingPatch};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn create_booking(
    State(state): State<AppState>,
    payload: Result<Json<BookingDraft>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(draft) = payload?;
    let booking = state.bookings.create(draft).await?;
    Ok(created(booking, "Booking created"))
}

pub async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<BookingPatch>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(patch) = payload?;
    let booking = state.bookings.update(id, patch).await?;
    Ok(success(booking, "Booking updated"))
}
