//! Notification endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CurrentUser};
use crate::db::repository::{self, NotificationFilter};
use crate::models::Notification;

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

/// `GET /api/notifications?filter=all|unread|appointments|updates|reminders`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let filter = match query.filter.as_deref() {
        None => NotificationFilter::All,
        Some(raw) => NotificationFilter::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown filter: {raw}")))?,
    };

    let conn = ctx.core.lock_db()?;
    Ok(Json(NotificationListResponse {
        notifications: repository::list_notifications(&conn, &user.id, filter)?,
        unread_count: repository::unread_notification_count(&conn, &user.id)?,
    }))
}

fn owned_notification(
    conn: &rusqlite::Connection,
    user_id: &str,
    id: &str,
) -> Result<Notification, ApiError> {
    repository::get_notification(conn, id)?
        .filter(|n| n.user_id == user_id)
        .ok_or_else(|| ApiError::NotFound("notification not found".into()))
}

/// `POST /api/notifications/:id/read`: mark one notification read.
pub async fn mark_read(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    let conn = ctx.core.lock_db()?;
    owned_notification(&conn, &user.id, &id)?;
    repository::mark_notification_read(&conn, &id)?;
    Ok(Json(owned_notification(&conn, &user.id, &id)?))
}

/// `POST /api/notifications/read-all`
pub async fn mark_all_read(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let marked = repository::mark_all_notifications_read(&conn, &user.id)?;
    Ok(Json(serde_json::json!({ "marked_read": marked })))
}

/// `DELETE /api/notifications/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.lock_db()?;
    owned_notification(&conn, &user.id, &id)?;
    repository::delete_notification(&conn, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/notifications/unread-count`: badge counter.
pub async fn unread_count(
    State(ctx): State<ApiContext>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.core.lock_db()?;
    let count = repository::unread_notification_count(&conn, &user.id)?;
    Ok(Json(serde_json::json!({ "unread_count": count })))
}
