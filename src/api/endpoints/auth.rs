//! Registration, login, logout and own-profile endpoints.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::accounts::{self, DoctorProfileInput, ProfileUpdate, Registration};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::models::User;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct RegisterDoctorRequest {
    #[serde(flatten)]
    pub account: RegisterRequest,
    pub specialization: String,
    pub license_number: String,
    pub consultation_fee: f64,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub years_of_experience: u32,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub user: User,
    /// False for doctor accounts awaiting admin approval.
    pub can_log_in: bool,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Registration {
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
        }
    }
}

/// `POST /api/auth/register`: create a patient account.
pub async fn register(
    State(ctx): State<ApiContext>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let user = accounts::register_patient(&conn, &body.into())?;
    Ok(Json(RegisterResponse { user, can_log_in: true }))
}

/// `POST /api/auth/register-doctor`: create a doctor account. The account
/// cannot log in until an admin approves it.
pub async fn register_doctor(
    State(ctx): State<ApiContext>,
    Json(body): Json<RegisterDoctorRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let profile = DoctorProfileInput {
        specialization: body.specialization.clone(),
        license_number: body.license_number.clone(),
        consultation_fee: body.consultation_fee,
        bio: body.bio.clone(),
        years_of_experience: body.years_of_experience,
    };
    let mut conn = ctx.core.lock_db()?;
    let user = accounts::register_doctor(&mut conn, &body.account.into(), &profile)?;
    Ok(Json(RegisterResponse { user, can_log_in: false }))
}

/// `POST /api/auth/login`: exchange credentials for a bearer token.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = {
        let conn = ctx.core.lock_db()?;
        accounts::authenticate(&conn, &body.email, &body.password)?
    };
    let token = {
        let mut sessions = ctx
            .sessions
            .lock()
            .map_err(|_| ApiError::Internal("session lock".into()))?;
        sessions.issue(&user.id)
    };
    tracing::debug!(user_id = %user.id, "login");
    Ok(Json(LoginResponse { token, user }))
}

#[derive(Deserialize)]
pub struct ProfileUpdateRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// `GET /api/me`: the authenticated account.
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<User> {
    Json(user)
}

/// `PUT /api/me`: update the caller's profile. The email must stay unique.
pub async fn update_profile(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<ProfileUpdateRequest>,
) -> Result<Json<User>, ApiError> {
    let update = ProfileUpdate {
        first_name: body.first_name,
        last_name: body.last_name,
        email: body.email,
        phone: body.phone,
    };
    let conn = ctx.core.lock_db()?;
    let updated = accounts::update_profile(&conn, &user, &update)?;
    Ok(Json(updated))
}

/// `POST /api/auth/logout`: revoke the presented token.
pub async fn logout(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let mut sessions = ctx
        .sessions
        .lock()
        .map_err(|_| ApiError::Internal("session lock".into()))?;
    if !sessions.revoke(token) {
        return Err(ApiError::Unauthorized);
    }
    Ok(Json(serde_json::json!({ "logged_out": true })))
}
