use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Doctor, DoctorSchedule, Weekday};

use super::column_parse_error;

const DOCTOR_COLUMNS: &str = "user_id, specialization, license_number, consultation_fee, bio, \
     years_of_experience, is_available, created_at, updated_at";

fn doctor_from_row(row: &Row) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        user_id: row.get(0)?,
        specialization: row.get(1)?,
        license_number: row.get(2)?,
        consultation_fee: row.get(3)?,
        bio: row.get(4)?,
        years_of_experience: row.get(5)?,
        is_available: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO doctors ({DOCTOR_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            doctor.user_id,
            doctor.specialization,
            doctor.license_number,
            doctor.consultation_fee,
            doctor.bio,
            doctor.years_of_experience,
            doctor.is_available,
            doctor.created_at,
            doctor.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_doctor(conn: &Connection, user_id: &str) -> Result<Option<Doctor>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE user_id = ?1"))?;
    match stmt.query_row(params![user_id], doctor_from_row) {
        Ok(doctor) => Ok(Some(doctor)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_doctor(
    conn: &Connection,
    user_id: &str,
    specialization: &str,
    license_number: &str,
    consultation_fee: f64,
    bio: Option<&str>,
    years_of_experience: u32,
) -> Result<(), DatabaseError> {
    let now = chrono::Local::now().naive_local();
    let changed = conn.execute(
        "UPDATE doctors SET specialization = ?1, license_number = ?2, consultation_fee = ?3,
                bio = ?4, years_of_experience = ?5, updated_at = ?6
         WHERE user_id = ?7",
        params![specialization, license_number, consultation_fee, bio, years_of_experience, now, user_id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound { entity_type: "Doctor".into(), id: user_id.into() });
    }
    Ok(())
}

pub fn set_doctor_availability(
    conn: &Connection,
    user_id: &str,
    is_available: bool,
) -> Result<(), DatabaseError> {
    let now = chrono::Local::now().naive_local();
    let changed = conn.execute(
        "UPDATE doctors SET is_available = ?1, updated_at = ?2 WHERE user_id = ?3",
        params![is_available, now, user_id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound { entity_type: "Doctor".into(), id: user_id.into() });
    }
    Ok(())
}

/// Mean rating over this doctor's ratings, 0.0 when unrated.
pub fn average_rating(conn: &Connection, doctor_id: &str) -> Result<f64, DatabaseError> {
    let avg: Option<f64> = conn.query_row(
        "SELECT AVG(rating) FROM doctor_ratings WHERE doctor_id = ?1",
        params![doctor_id],
        |row| row.get(0),
    )?;
    Ok(avg.map(|a| (a * 10.0).round() / 10.0).unwrap_or(0.0))
}

pub fn rating_count(conn: &Connection, doctor_id: &str) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM doctor_ratings WHERE doctor_id = ?1",
        params![doctor_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Public directory entry: doctor joined with account identity and rating stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorListing {
    pub user_id: String,
    pub full_name: String,
    pub specialization: String,
    pub consultation_fee: f64,
    pub years_of_experience: u32,
    pub average_rating: f64,
    pub rating_count: i64,
}

/// Lists approved, active, available doctors, optionally filtered by a
/// case-insensitive search over name and specialization and by a minimum
/// average rating. Unrated doctors count as 0.0 for the rating filter.
pub fn list_available_doctors(
    conn: &Connection,
    search: Option<&str>,
    min_rating: Option<f64>,
) -> Result<Vec<DoctorListing>, DatabaseError> {
    let sql = "SELECT d.user_id, u.first_name || ' ' || u.last_name, d.specialization,
                      d.consultation_fee, d.years_of_experience,
                      COALESCE((SELECT ROUND(AVG(r.rating), 1) FROM doctor_ratings r WHERE r.doctor_id = d.user_id), 0.0),
                      (SELECT COUNT(*) FROM doctor_ratings r WHERE r.doctor_id = d.user_id)
               FROM doctors d
               JOIN users u ON u.id = d.user_id
               WHERE u.is_approved = 1 AND u.is_active = 1 AND d.is_available = 1
                 AND (?1 IS NULL
                      OR u.first_name LIKE '%' || ?1 || '%' COLLATE NOCASE
                      OR u.last_name LIKE '%' || ?1 || '%' COLLATE NOCASE
                      OR d.specialization LIKE '%' || ?1 || '%' COLLATE NOCASE)
                 AND (?2 IS NULL
                      OR COALESCE((SELECT AVG(r.rating) FROM doctor_ratings r WHERE r.doctor_id = d.user_id), 0.0) >= ?2)
               ORDER BY u.last_name, u.first_name";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![search, min_rating], |row| {
        Ok(DoctorListing {
            user_id: row.get(0)?,
            full_name: row.get(1)?,
            specialization: row.get(2)?,
            consultation_fee: row.get(3)?,
            years_of_experience: row.get(4)?,
            average_rating: row.get(5)?,
            rating_count: row.get(6)?,
        })
    })?;

    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

// ─── Weekly schedule ─────────────────────────────────────────────────────────

/// Insert or replace one weekly slot for a doctor.
pub fn upsert_schedule_slot(
    conn: &Connection,
    slot: &DoctorSchedule,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctor_schedules (id, doctor_id, day_of_week, start_time, end_time, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (doctor_id, day_of_week, start_time)
         DO UPDATE SET end_time = excluded.end_time, is_active = excluded.is_active",
        params![
            slot.id,
            slot.doctor_id,
            slot.day_of_week.as_str(),
            slot.start_time,
            slot.end_time,
            slot.is_active,
        ],
    )?;
    Ok(())
}

pub fn list_schedule(conn: &Connection, doctor_id: &str) -> Result<Vec<DoctorSchedule>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, doctor_id, day_of_week, start_time, end_time, is_active
         FROM doctor_schedules WHERE doctor_id = ?1 AND is_active = 1
         ORDER BY CASE day_of_week
                    WHEN 'monday' THEN 0 WHEN 'tuesday' THEN 1 WHEN 'wednesday' THEN 2
                    WHEN 'thursday' THEN 3 WHEN 'friday' THEN 4 WHEN 'saturday' THEN 5
                    ELSE 6 END, start_time",
    )?;

    let rows = stmt.query_map(params![doctor_id], |row| {
        Ok(DoctorSchedule {
            id: row.get(0)?,
            doctor_id: row.get(1)?,
            day_of_week: Weekday::from_str(&row.get::<_, String>(2)?)
                .map_err(|e| column_parse_error(2, e))?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            is_active: row.get(5)?,
        })
    })?;

    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Convenience for tests and admin flows: a fresh schedule slot.
pub fn new_schedule_slot(
    doctor_id: &str,
    day: Weekday,
    start: chrono::NaiveTime,
    end: chrono::NaiveTime,
) -> DoctorSchedule {
    DoctorSchedule {
        id: Uuid::new_v4().to_string(),
        doctor_id: doctor_id.into(),
        day_of_week: day,
        start_time: start,
        end_time: end,
        is_active: true,
    }
}
