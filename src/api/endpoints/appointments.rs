//! Appointment endpoints: booking, lifecycle actions, rating and receipt.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::booking::{self, BookingRequest};
use crate::db::repository;
use crate::models::{Appointment, AppointmentStatus, DoctorRating, Role};
use crate::receipt;

fn parse_time(value: &str) -> Result<NaiveTime, ApiError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ApiError::BadRequest(format!("invalid time: {value}")))
}

#[derive(Deserialize)]
pub struct BookRequest {
    pub doctor_id: String,
    pub date: NaiveDate,
    pub time: String,
    pub reason: String,
}

#[derive(Serialize)]
pub struct AppointmentResponse {
    pub appointment: Appointment,
}

/// `POST /api/appointments`: book an appointment with a doctor.
pub async fn book(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<BookRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), ApiError> {
    let request = BookingRequest {
        doctor_id: body.doctor_id,
        date: body.date,
        time: parse_time(&body.time)?,
        reason: body.reason,
    };
    let mut conn = ctx.core.lock_db()?;
    let appointment = booking::book(&mut conn, &user, &request)?;
    Ok((StatusCode::CREATED, Json(AppointmentResponse { appointment })))
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct AppointmentListResponse {
    pub appointments: Vec<Appointment>,
}

/// `GET /api/appointments`: the caller's appointments, optionally filtered
/// by status and date. Admins see everything.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<AppointmentListResponse>, ApiError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(
            AppointmentStatus::from_str(s)
                .map_err(|_| ApiError::BadRequest(format!("unknown status: {s}")))?,
        ),
        None => None,
    };

    let conn = ctx.core.lock_db()?;
    let mut appointments = match user.role {
        Role::Patient => repository::list_for_patient(&conn, &user.id, status)?,
        Role::Doctor => repository::list_for_doctor(&conn, &user.id, status)?,
        Role::Admin => repository::list_all(&conn)?,
    };
    if let Some(date) = query.date {
        appointments.retain(|a| a.date == date);
    }
    Ok(Json(AppointmentListResponse { appointments }))
}

/// `GET /api/appointments/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let appointment = booking::get_appointment_for_user(&conn, &user, &id)?;
    Ok(Json(AppointmentResponse { appointment }))
}

#[derive(Deserialize)]
pub struct ActionRequest {
    pub action: String,
}

/// `POST /api/appointments/:id/action`: doctor confirms, cancels or
/// completes an appointment.
pub async fn action(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<ActionRequest>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let to = match body.action.as_str() {
        "confirm" => AppointmentStatus::Confirmed,
        "cancel" => AppointmentStatus::Cancelled,
        "complete" => AppointmentStatus::Completed,
        other => return Err(ApiError::BadRequest(format!("unknown action: {other}"))),
    };
    let mut conn = ctx.core.lock_db()?;
    let appointment = booking::doctor_transition(&mut conn, &user, &id, to)?;
    Ok(Json(AppointmentResponse { appointment }))
}

/// `POST /api/appointments/:id/cancel`: patient cancels their appointment.
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let mut conn = ctx.core.lock_db()?;
    let appointment = booking::patient_cancel(&mut conn, &user, &id)?;
    Ok(Json(AppointmentResponse { appointment }))
}

#[derive(Deserialize)]
pub struct RescheduleRequest {
    pub date: NaiveDate,
    pub time: String,
    pub reason: String,
}

/// `PUT /api/appointments/:id`: patient reschedules an open appointment.
pub async fn reschedule(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<RescheduleRequest>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let time = parse_time(&body.time)?;
    let conn = ctx.core.lock_db()?;
    let appointment = booking::reschedule(&conn, &user, &id, body.date, time, &body.reason)?;
    Ok(Json(AppointmentResponse { appointment }))
}

/// `POST /api/appointments/:id/confirm-completion`: patient confirms the
/// visit happened. Unlocks rating.
pub async fn confirm_completion(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let appointment = booking::confirm_completion(&conn, &user, &id)?;
    Ok(Json(AppointmentResponse { appointment }))
}

/// `POST /api/appointments/:id/acknowledge`: either side files a completed
/// appointment away.
pub async fn acknowledge(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let appointment = booking::acknowledge(&conn, &user, &id)?;
    Ok(Json(AppointmentResponse { appointment }))
}

#[derive(Deserialize)]
pub struct RatingRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Serialize)]
pub struct RatingResponse {
    pub rating: DoctorRating,
}

/// `POST /api/appointments/:id/rating`: rate the doctor after a completed,
/// confirmed appointment.
pub async fn rate(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<RatingRequest>,
) -> Result<(StatusCode, Json<RatingResponse>), ApiError> {
    let conn = ctx.core.lock_db()?;
    let rating = booking::rate(&conn, &user, &id, body.rating, body.comment)?;
    Ok((StatusCode::CREATED, Json(RatingResponse { rating })))
}

/// `GET /api/appointments/:id/receipt`: PDF receipt for a participant.
pub async fn receipt(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.lock_db()?;
    let appointment = booking::get_appointment_for_user(&conn, &user, &id)?;
    let data = receipt::receipt_data(&conn, &user, &appointment)?;
    let bytes = receipt::generate_receipt_pdf(&data)?;

    let filename = format!("receipt-{id}.pdf");
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
