use rusqlite::{params, Connection, Row};

use crate::db::DatabaseError;
use crate::models::DoctorRating;

const RATING_COLUMNS: &str =
    "id, appointment_id, doctor_id, patient_id, rating, comment, created_at";

fn rating_from_row(row: &Row) -> rusqlite::Result<DoctorRating> {
    Ok(DoctorRating {
        id: row.get(0)?,
        appointment_id: row.get(1)?,
        doctor_id: row.get(2)?,
        patient_id: row.get(3)?,
        rating: row.get(4)?,
        comment: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Insert a rating. The UNIQUE(appointment_id, patient_id) index rejects a
/// second rating for the same appointment; callers map that to a conflict.
pub fn insert_rating(conn: &Connection, rating: &DoctorRating) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO doctor_ratings ({RATING_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            rating.id,
            rating.appointment_id,
            rating.doctor_id,
            rating.patient_id,
            rating.rating,
            rating.comment,
            rating.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_rating_for_appointment(
    conn: &Connection,
    appointment_id: &str,
    patient_id: &str,
) -> Result<Option<DoctorRating>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RATING_COLUMNS} FROM doctor_ratings WHERE appointment_id = ?1 AND patient_id = ?2"
    ))?;
    match stmt.query_row(params![appointment_id, patient_id], rating_from_row) {
        Ok(rating) => Ok(Some(rating)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_ratings_for_doctor(
    conn: &Connection,
    doctor_id: &str,
) -> Result<Vec<DoctorRating>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RATING_COLUMNS} FROM doctor_ratings WHERE doctor_id = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![doctor_id], rating_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Star breakdown for a doctor profile: (stars, count) for 5 down to 1.
pub fn rating_breakdown(conn: &Connection, doctor_id: &str) -> Result<Vec<(u8, i64)>, DatabaseError> {
    let mut breakdown = Vec::with_capacity(5);
    let mut stmt = conn.prepare(
        "SELECT COUNT(*) FROM doctor_ratings WHERE doctor_id = ?1 AND rating = ?2",
    )?;
    for stars in (1..=5u8).rev() {
        let count: i64 = stmt.query_row(params![doctor_id, stars], |row| row.get(0))?;
        breakdown.push((stars, count));
    }
    Ok(breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::appointment::tests::{seed_participants, test_appointment};
    use crate::db::repository::insert_appointment;
    use crate::db::sqlite::open_memory_database;

    fn test_rating(id: &str, appointment_id: &str, stars: u8) -> DoctorRating {
        DoctorRating {
            id: id.into(),
            appointment_id: appointment_id.into(),
            doctor_id: "doc-1".into(),
            patient_id: "pat-1".into(),
            rating: stars,
            comment: Some("Thorough and on time".into()),
            created_at: chrono::Local::now().naive_local(),
        }
    }

    #[test]
    fn insert_and_fetch() {
        let conn = open_memory_database().unwrap();
        seed_participants(&conn);
        insert_appointment(&conn, &test_appointment("a1", "2026-09-10", "10:30")).unwrap();
        insert_rating(&conn, &test_rating("r1", "a1", 4)).unwrap();

        let rating = get_rating_for_appointment(&conn, "a1", "pat-1").unwrap().unwrap();
        assert_eq!(rating.rating, 4);
        assert!(get_rating_for_appointment(&conn, "a1", "someone-else").unwrap().is_none());
    }

    #[test]
    fn comment_is_optional() {
        let conn = open_memory_database().unwrap();
        seed_participants(&conn);
        insert_appointment(&conn, &test_appointment("a1", "2026-09-10", "10:30")).unwrap();

        let mut rating = test_rating("r1", "a1", 4);
        rating.comment = None;
        insert_rating(&conn, &rating).unwrap();

        let stored = get_rating_for_appointment(&conn, "a1", "pat-1").unwrap().unwrap();
        assert!(stored.comment.is_none());
    }

    #[test]
    fn check_violation_is_not_a_duplicate() {
        let conn = open_memory_database().unwrap();
        seed_participants(&conn);
        insert_appointment(&conn, &test_appointment("a1", "2026-09-10", "10:30")).unwrap();

        // rating=6 trips the CHECK constraint, not the UNIQUE index
        let err = insert_rating(&conn, &test_rating("r1", "a1", 6)).unwrap_err();
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn one_rating_per_appointment_and_patient() {
        let conn = open_memory_database().unwrap();
        seed_participants(&conn);
        insert_appointment(&conn, &test_appointment("a1", "2026-09-10", "10:30")).unwrap();
        insert_rating(&conn, &test_rating("r1", "a1", 5)).unwrap();

        let err = insert_rating(&conn, &test_rating("r2", "a1", 2)).unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn breakdown_counts_per_star() {
        let conn = open_memory_database().unwrap();
        seed_participants(&conn);
        for (i, stars) in [5u8, 5, 3].iter().enumerate() {
            let appt_id = format!("a{i}");
            insert_appointment(&conn, &test_appointment(&appt_id, "2026-09-10", "10:30")).unwrap();
            insert_rating(&conn, &test_rating(&format!("r{i}"), &appt_id, *stars)).unwrap();
        }

        let breakdown = rating_breakdown(&conn, "doc-1").unwrap();
        assert_eq!(breakdown, vec![(5, 2), (4, 0), (3, 1), (2, 0), (1, 0)]);
    }
}
