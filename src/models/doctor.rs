use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::enums::Weekday;

/// Practitioner record, 1:1 with a user of role doctor.
/// `user_id` doubles as the doctor id everywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub user_id: String,
    pub specialization: String,
    pub license_number: String,
    pub consultation_fee: f64,
    pub bio: Option<String>,
    pub years_of_experience: u32,
    pub is_available: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// One weekly availability slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSchedule {
    pub id: String,
    pub doctor_id: String,
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
}
