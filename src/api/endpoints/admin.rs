//! Admin surface: doctor account management, approval and platform
//! statistics.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::accounts::{self, DoctorProfileInput};
use crate::api::endpoints::auth::RegisterDoctorRequest;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::db::repository;
use crate::models::{Appointment, Doctor, Role, User};

fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.role != Role::Admin {
        return Err(ApiError::Forbidden("admin account required".into()));
    }
    Ok(())
}

#[derive(Serialize)]
pub struct PendingDoctorsResponse {
    pub doctors: Vec<User>,
}

/// `GET /api/admin/doctors/pending`: doctor accounts awaiting approval.
pub async fn pending_doctors(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<PendingDoctorsResponse>, ApiError> {
    require_admin(&user)?;
    let conn = ctx.core.lock_db()?;
    let doctors = repository::list_unapproved_doctors(&conn)?;
    Ok(Json(PendingDoctorsResponse { doctors }))
}

/// `POST /api/admin/doctors/:id/approve`: approve a doctor account so it
/// can log in and take bookings.
pub async fn approve_doctor(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&user)?;
    let conn = ctx.core.lock_db()?;
    repository::approve_doctor_user(&conn, &id)
        .map_err(|_| ApiError::NotFound("doctor not found".into()))?;
    tracing::info!(doctor_id = %id, "doctor approved");
    Ok(Json(serde_json::json!({ "approved": true })))
}

#[derive(Serialize)]
pub struct CreatedDoctorResponse {
    pub user: User,
    pub profile: Doctor,
}

/// `POST /api/admin/doctors`: create a doctor account that can log in and
/// take bookings immediately, skipping the approval queue.
pub async fn create_doctor(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<RegisterDoctorRequest>,
) -> Result<(StatusCode, Json<CreatedDoctorResponse>), ApiError> {
    require_admin(&user)?;
    let profile = DoctorProfileInput {
        specialization: body.specialization.clone(),
        license_number: body.license_number.clone(),
        consultation_fee: body.consultation_fee,
        bio: body.bio.clone(),
        years_of_experience: body.years_of_experience,
    };
    let mut conn = ctx.core.lock_db()?;
    let created = accounts::create_doctor_account(&mut conn, &body.account.into(), &profile)?;
    let profile = repository::get_doctor(&conn, &created.id)?
        .ok_or_else(|| ApiError::Internal("doctor profile missing after create".into()))?;
    Ok((StatusCode::CREATED, Json(CreatedDoctorResponse { user: created, profile })))
}

#[derive(Deserialize)]
pub struct EditDoctorRequest {
    pub specialization: String,
    pub license_number: String,
    pub consultation_fee: f64,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub years_of_experience: u32,
}

/// `PUT /api/admin/doctors/:id`: replace a doctor's professional profile.
pub async fn edit_doctor(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<EditDoctorRequest>,
) -> Result<Json<Doctor>, ApiError> {
    require_admin(&user)?;
    if body.specialization.trim().is_empty() || body.license_number.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "specialization and license number are required".into(),
        ));
    }
    let conn = ctx.core.lock_db()?;
    repository::update_doctor(
        &conn,
        &id,
        body.specialization.trim(),
        body.license_number.trim(),
        body.consultation_fee,
        body.bio.as_deref(),
        body.years_of_experience,
    )
    .map_err(|_| ApiError::NotFound("doctor not found".into()))?;
    let profile = repository::get_doctor(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("doctor not found".into()))?;
    Ok(Json(profile))
}

#[derive(Serialize)]
pub struct PlatformStatsResponse {
    pub patients: i64,
    pub doctors: i64,
    pub appointments: i64,
    pub appointments_by_status: Vec<(String, i64)>,
}

/// `GET /api/admin/stats`
pub async fn stats(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<PlatformStatsResponse>, ApiError> {
    require_admin(&user)?;
    let conn = ctx.core.lock_db()?;
    let by_status = repository::count_by_status(&conn)?
        .into_iter()
        .map(|(status, count)| (status.as_str().to_string(), count))
        .collect();

    Ok(Json(PlatformStatsResponse {
        patients: repository::count_users_by_role(&conn, Role::Patient)?,
        doctors: repository::count_users_by_role(&conn, Role::Doctor)?,
        appointments: repository::count_appointments(&conn)?,
        appointments_by_status: by_status,
    }))
}

#[derive(Serialize)]
pub struct AllAppointmentsResponse {
    pub appointments: Vec<Appointment>,
}

/// `GET /api/admin/appointments`: every appointment on the platform.
pub async fn all_appointments(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<AllAppointmentsResponse>, ApiError> {
    require_admin(&user)?;
    let conn = ctx.core.lock_db()?;
    Ok(Json(AllAppointmentsResponse { appointments: repository::list_all(&conn)? }))
}
