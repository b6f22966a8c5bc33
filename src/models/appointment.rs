use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: String,
    pub notes: String,
    pub status: AppointmentStatus,
    /// Set by the patient after the doctor marks the visit completed.
    /// A rating is only allowed once this is true.
    pub patient_confirmed_completion: bool,
    pub patient_acknowledged: bool,
    pub doctor_acknowledged: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Appointment {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.patient_id == user_id || self.doctor_id == user_id
    }
}
