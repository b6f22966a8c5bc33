//! Doctor directory, public profile, and the doctor's own surface
//! (availability, weekly schedule, dashboard).

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::db::repository::{self, DoctorListing};
use crate::models::{AppointmentStatus, Doctor, DoctorRating, DoctorSchedule, Role, User, Weekday};

#[derive(Deserialize)]
pub struct DirectoryQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub min_rating: Option<f64>,
}

#[derive(Serialize)]
pub struct DirectoryResponse {
    pub doctors: Vec<DoctorListing>,
}

/// `GET /api/doctors`: approved, available doctors, optionally filtered by
/// search text and minimum average rating.
pub async fn directory(
    State(ctx): State<ApiContext>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<DirectoryResponse>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let doctors =
        repository::list_available_doctors(&conn, query.search.as_deref(), query.min_rating)?;
    Ok(Json(DirectoryResponse { doctors }))
}

#[derive(Serialize)]
pub struct DoctorProfileResponse {
    pub full_name: String,
    pub profile: Doctor,
    pub average_rating: f64,
    pub rating_count: i64,
    pub rating_breakdown: Vec<(u8, i64)>,
    pub ratings: Vec<DoctorRating>,
    pub schedule: Vec<DoctorSchedule>,
}

/// `GET /api/doctors/:id`: full public profile with ratings and schedule.
/// Unapproved doctors are only visible to themselves and admins.
pub async fn profile(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<DoctorProfileResponse>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let doctor_user = repository::get_user(&conn, &id)?
        .filter(|u| u.role == Role::Doctor)
        .ok_or_else(|| ApiError::NotFound("doctor not found".into()))?;
    let visible = doctor_user.is_approved && doctor_user.is_active
        || user.role == Role::Admin
        || user.id == id;
    if !visible {
        return Err(ApiError::NotFound("doctor not found".into()));
    }
    let profile = repository::get_doctor(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("doctor not found".into()))?;

    Ok(Json(DoctorProfileResponse {
        full_name: doctor_user.full_name(),
        profile,
        average_rating: repository::average_rating(&conn, &id)?,
        rating_count: repository::rating_count(&conn, &id)?,
        rating_breakdown: repository::rating_breakdown(&conn, &id)?,
        ratings: repository::list_ratings_for_doctor(&conn, &id)?,
        schedule: repository::list_schedule(&conn, &id)?,
    }))
}

fn require_doctor(user: &User) -> Result<(), ApiError> {
    if user.role != Role::Doctor {
        return Err(ApiError::Forbidden("doctor account required".into()));
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct AvailabilityRequest {
    pub is_available: bool,
}

/// `PUT /api/doctors/me/availability`: toggle whether new bookings are
/// accepted.
pub async fn set_availability(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<AvailabilityRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_doctor(&user)?;
    let conn = ctx.core.lock_db()?;
    repository::set_doctor_availability(&conn, &user.id, body.is_available)?;
    Ok(Json(serde_json::json!({ "is_available": body.is_available })))
}

#[derive(Deserialize)]
pub struct ScheduleSlotRequest {
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Serialize)]
pub struct ScheduleResponse {
    pub schedule: Vec<DoctorSchedule>,
}

fn parse_slot_time(value: &str) -> Result<NaiveTime, ApiError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ApiError::BadRequest(format!("invalid time: {value}")))
}

/// `PUT /api/doctors/me/schedule`: add or replace weekly slots.
pub async fn upsert_schedule(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(slots): Json<Vec<ScheduleSlotRequest>>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    require_doctor(&user)?;

    let conn = ctx.core.lock_db()?;
    for slot in &slots {
        let day = Weekday::from_str(&slot.day_of_week)
            .map_err(|_| ApiError::BadRequest(format!("unknown weekday: {}", slot.day_of_week)))?;
        let start = parse_slot_time(&slot.start_time)?;
        let end = parse_slot_time(&slot.end_time)?;
        if end <= start {
            return Err(ApiError::BadRequest("slot must end after it starts".into()));
        }
        repository::upsert_schedule_slot(
            &conn,
            &repository::new_schedule_slot(&user.id, day, start, end),
        )?;
    }
    Ok(Json(ScheduleResponse { schedule: repository::list_schedule(&conn, &user.id)? }))
}

#[derive(Serialize)]
pub struct PatientSummary {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Serialize)]
pub struct PatientsResponse {
    pub patients: Vec<PatientSummary>,
}

/// `GET /api/doctors/me/patients`: every patient this doctor has had an
/// appointment with.
pub async fn patients(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<PatientsResponse>, ApiError> {
    require_doctor(&user)?;
    let conn = ctx.core.lock_db()?;

    let mut patients = Vec::new();
    for patient_id in repository::distinct_patient_ids(&conn, &user.id)? {
        if let Some(p) = repository::get_user(&conn, &patient_id)? {
            let full_name = p.full_name();
            patients.push(PatientSummary { id: p.id, full_name, email: p.email, phone: p.phone });
        }
    }
    patients.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    Ok(Json(PatientsResponse { patients }))
}

#[derive(Serialize)]
pub struct DoctorDashboardResponse {
    pub pending_appointments: i64,
    pub confirmed_appointments: i64,
    pub completed_appointments: i64,
    pub distinct_patients: i64,
    pub average_rating: f64,
    pub rating_count: i64,
}

/// `GET /api/doctors/me/dashboard`: the doctor's practice at a glance.
pub async fn dashboard(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<DoctorDashboardResponse>, ApiError> {
    require_doctor(&user)?;
    let conn = ctx.core.lock_db()?;

    let count_with = |status: AppointmentStatus| -> Result<i64, ApiError> {
        Ok(repository::list_for_doctor(&conn, &user.id, Some(status))?.len() as i64)
    };

    Ok(Json(DoctorDashboardResponse {
        pending_appointments: count_with(AppointmentStatus::Pending)?,
        confirmed_appointments: count_with(AppointmentStatus::Confirmed)?,
        completed_appointments: count_with(AppointmentStatus::Completed)?,
        distinct_patients: repository::count_distinct_patients(&conn, &user.id)?,
        average_rating: repository::average_rating(&conn, &user.id)?,
        rating_count: repository::rating_count(&conn, &user.id)?,
    }))
}
