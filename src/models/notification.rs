use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::NotificationType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
    pub read_at: Option<NaiveDateTime>,
}
