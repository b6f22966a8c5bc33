use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Rating given by a patient to a doctor after a confirmed-complete visit.
/// At most one per appointment (UNIQUE constraint in the schema).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorRating {
    pub id: String,
    pub appointment_id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
}
