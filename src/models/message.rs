use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One message in an appointment thread, ordered by creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentMessage {
    pub id: String,
    pub appointment_id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}
