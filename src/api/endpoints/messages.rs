//! Message thread endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::messaging::{self, ThreadSummary};
use crate::models::AppointmentMessage;

#[derive(Serialize)]
pub struct InboxResponse {
    pub threads: Vec<ThreadSummary>,
}

/// `GET /api/messages`: conversation inbox, most recently active first.
pub async fn inbox(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<InboxResponse>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let threads = messaging::inbox(&conn, &user)?;
    Ok(Json(InboxResponse { threads }))
}

#[derive(Serialize)]
pub struct ThreadResponse {
    pub messages: Vec<AppointmentMessage>,
}

/// `GET /api/appointments/:id/messages`: the full thread. Reading does
/// not change read state.
pub async fn thread(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(appointment_id): Path<String>,
) -> Result<Json<ThreadResponse>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let messages = messaging::thread(&conn, &user, &appointment_id)?;
    Ok(Json(ThreadResponse { messages }))
}

#[derive(Deserialize)]
pub struct SendRequest {
    pub body: String,
}

#[derive(Serialize)]
pub struct SendResponse {
    pub message: AppointmentMessage,
}

/// `POST /api/appointments/:id/messages`
pub async fn send(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(appointment_id): Path<String>,
    Json(body): Json<SendRequest>,
) -> Result<(StatusCode, Json<SendResponse>), ApiError> {
    let conn = ctx.core.lock_db()?;
    let message = messaging::send(&conn, &user, &appointment_id, &body.body)?;
    Ok((StatusCode::CREATED, Json(SendResponse { message })))
}

/// `POST /api/appointments/:id/messages/read`: explicitly mark the
/// caller's incoming messages as read.
pub async fn mark_read(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(appointment_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let marked = messaging::mark_thread_read(&conn, &user, &appointment_id)?;
    Ok(Json(serde_json::json!({ "marked_read": marked })))
}

/// `DELETE /api/messages/:id`
pub async fn delete_message(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(message_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.lock_db()?;
    messaging::delete_message(&conn, &user, &message_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/appointments/:id/messages`: drop the whole conversation.
pub async fn delete_conversation(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(appointment_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let deleted = messaging::delete_conversation(&conn, &user, &appointment_id)?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}
