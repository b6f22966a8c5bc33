use std::str::FromStr;

use rusqlite::{params, Connection, Row};

use crate::db::DatabaseError;
use crate::models::{Appointment, AppointmentStatus, Role};

use super::column_parse_error;

const APPOINTMENT_COLUMNS: &str = "id, patient_id, doctor_id, date, time, reason, notes, status, \
     patient_confirmed_completion, patient_acknowledged, doctor_acknowledged, created_at, updated_at";

fn appointment_from_row(row: &Row) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        date: row.get(3)?,
        time: row.get(4)?,
        reason: row.get(5)?,
        notes: row.get(6)?,
        status: AppointmentStatus::from_str(&row.get::<_, String>(7)?)
            .map_err(|e| column_parse_error(7, e))?,
        patient_confirmed_completion: row.get(8)?,
        patient_acknowledged: row.get(9)?,
        doctor_acknowledged: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO appointments ({APPOINTMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ),
        params![
            appt.id,
            appt.patient_id,
            appt.doctor_id,
            appt.date,
            appt.time,
            appt.reason,
            appt.notes,
            appt.status.as_str(),
            appt.patient_confirmed_completion,
            appt.patient_acknowledged,
            appt.doctor_acknowledged,
            appt.created_at,
            appt.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &str) -> Result<Option<Appointment>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"))?;
    match stmt.query_row(params![id], appointment_from_row) {
        Ok(appt) => Ok(Some(appt)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_status(
    conn: &Connection,
    id: &str,
    status: AppointmentStatus,
) -> Result<(), DatabaseError> {
    let now = chrono::Local::now().naive_local();
    let changed = conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now, id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound { entity_type: "Appointment".into(), id: id.into() });
    }
    Ok(())
}

pub fn update_schedule(
    conn: &Connection,
    id: &str,
    date: chrono::NaiveDate,
    time: chrono::NaiveTime,
    reason: &str,
) -> Result<(), DatabaseError> {
    let now = chrono::Local::now().naive_local();
    let changed = conn.execute(
        "UPDATE appointments SET date = ?1, time = ?2, reason = ?3, updated_at = ?4 WHERE id = ?5",
        params![date, time, reason, now, id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound { entity_type: "Appointment".into(), id: id.into() });
    }
    Ok(())
}

pub fn set_patient_confirmed_completion(conn: &Connection, id: &str) -> Result<(), DatabaseError> {
    let now = chrono::Local::now().naive_local();
    let changed = conn.execute(
        "UPDATE appointments SET patient_confirmed_completion = 1, updated_at = ?1 WHERE id = ?2",
        params![now, id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound { entity_type: "Appointment".into(), id: id.into() });
    }
    Ok(())
}

/// Set the per-role "done" flag on a completed appointment.
pub fn set_acknowledged(conn: &Connection, id: &str, role: Role) -> Result<(), DatabaseError> {
    let column = match role {
        Role::Patient => "patient_acknowledged",
        Role::Doctor => "doctor_acknowledged",
        Role::Admin => {
            return Err(DatabaseError::ConstraintViolation(
                "Admins do not acknowledge appointments".into(),
            ))
        }
    };
    let now = chrono::Local::now().naive_local();
    let changed = conn.execute(
        &format!("UPDATE appointments SET {column} = 1, updated_at = ?1 WHERE id = ?2"),
        params![now, id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound { entity_type: "Appointment".into(), id: id.into() });
    }
    Ok(())
}

pub fn list_for_patient(
    conn: &Connection,
    patient_id: &str,
    status: Option<AppointmentStatus>,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE patient_id = ?1 AND (?2 IS NULL OR status = ?2)
         ORDER BY date DESC, time DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id, status.map(|s| s.as_str())], appointment_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn list_for_doctor(
    conn: &Connection,
    doctor_id: &str,
    status: Option<AppointmentStatus>,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE doctor_id = ?1 AND (?2 IS NULL OR status = ?2)
         ORDER BY date DESC, time DESC"
    ))?;
    let rows = stmt.query_map(params![doctor_id, status.map(|s| s.as_str())], appointment_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Admin view: every appointment, newest first.
pub fn list_all(conn: &Connection) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map([], appointment_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn count_appointments(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_by_status(conn: &Connection) -> Result<Vec<(AppointmentStatus, i64)>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT status, COUNT(*) FROM appointments GROUP BY status ORDER BY status")?;
    let rows = stmt.query_map([], |row| {
        let status = AppointmentStatus::from_str(&row.get::<_, String>(0)?)
            .map_err(|e| column_parse_error(0, e))?;
        Ok((status, row.get::<_, i64>(1)?))
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Distinct patients a doctor has seen across all appointments.
pub fn count_distinct_patients(conn: &Connection, doctor_id: &str) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(DISTINCT patient_id) FROM appointments WHERE doctor_id = ?1",
        params![doctor_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn distinct_patient_ids(conn: &Connection, doctor_id: &str) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT patient_id FROM appointments WHERE doctor_id = ?1",
    )?;
    let rows = stmt.query_map(params![doctor_id], |row| row.get(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}
