use rusqlite::{params, Connection, Row};

use crate::db::DatabaseError;
use crate::models::AppointmentMessage;

const MESSAGE_COLUMNS: &str =
    "id, appointment_id, sender_id, recipient_id, body, is_read, created_at";

fn message_from_row(row: &Row) -> rusqlite::Result<AppointmentMessage> {
    Ok(AppointmentMessage {
        id: row.get(0)?,
        appointment_id: row.get(1)?,
        sender_id: row.get(2)?,
        recipient_id: row.get(3)?,
        body: row.get(4)?,
        is_read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn insert_message(conn: &Connection, message: &AppointmentMessage) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO appointment_messages ({MESSAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            message.id,
            message.appointment_id,
            message.sender_id,
            message.recipient_id,
            message.body,
            message.is_read,
            message.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_message(conn: &Connection, id: &str) -> Result<Option<AppointmentMessage>, DatabaseError> {
    let mut stmt =
        conn.prepare(&format!("SELECT {MESSAGE_COLUMNS} FROM appointment_messages WHERE id = ?1"))?;
    match stmt.query_row(params![id], message_from_row) {
        Ok(message) => Ok(Some(message)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Full thread for an appointment, oldest first. Reading a thread does not
/// mark anything; callers mark explicitly via [`mark_thread_read`].
pub fn list_thread(
    conn: &Connection,
    appointment_id: &str,
) -> Result<Vec<AppointmentMessage>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM appointment_messages
         WHERE appointment_id = ?1 ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![appointment_id], message_from_row)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Mark every message addressed to `recipient_id` in this thread as read.
/// Returns how many messages changed state.
pub fn mark_thread_read(
    conn: &Connection,
    appointment_id: &str,
    recipient_id: &str,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointment_messages SET is_read = 1
         WHERE appointment_id = ?1 AND recipient_id = ?2 AND is_read = 0",
        params![appointment_id, recipient_id],
    )?;
    Ok(changed)
}

pub fn unread_count(conn: &Connection, recipient_id: &str) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM appointment_messages WHERE recipient_id = ?1 AND is_read = 0",
        params![recipient_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn unread_count_for_thread(
    conn: &Connection,
    appointment_id: &str,
    recipient_id: &str,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM appointment_messages
         WHERE appointment_id = ?1 AND recipient_id = ?2 AND is_read = 0",
        params![appointment_id, recipient_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn delete_message(conn: &Connection, id: &str) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM appointment_messages WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(DatabaseError::NotFound { entity_type: "Message".into(), id: id.into() });
    }
    Ok(())
}

/// Drop an entire appointment thread. Returns how many messages were removed.
pub fn delete_thread(conn: &Connection, appointment_id: &str) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM appointment_messages WHERE appointment_id = ?1",
        params![appointment_id],
    )?;
    Ok(changed)
}

/// Appointment ids this user has messages in, ordered by most recent message.
pub fn thread_ids_for_user(conn: &Connection, user_id: &str) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT appointment_id, MAX(created_at) AS last_at FROM appointment_messages
         WHERE sender_id = ?1 OR recipient_id = ?1
         GROUP BY appointment_id ORDER BY last_at DESC",
    )?;
    let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::appointment::tests::{seed_participants, test_appointment};
    use crate::db::repository::insert_appointment;
    use crate::db::sqlite::open_memory_database;
    use chrono::NaiveDateTime;

    fn test_message(id: &str, from: &str, to: &str, at: &str) -> AppointmentMessage {
        AppointmentMessage {
            id: id.into(),
            appointment_id: "a1".into(),
            sender_id: from.into(),
            recipient_id: to.into(),
            body: format!("message {id}"),
            is_read: false,
            created_at: NaiveDateTime::parse_from_str(at, "%Y-%m-%d %H:%M:%S").unwrap(),
        }
    }

    fn seed_thread(conn: &Connection) {
        seed_participants(conn);
        insert_appointment(conn, &test_appointment("a1", "2026-09-10", "10:30")).unwrap();
        insert_message(conn, &test_message("m1", "pat-1", "doc-1", "2026-09-01 09:00:00")).unwrap();
        insert_message(conn, &test_message("m2", "doc-1", "pat-1", "2026-09-01 09:05:00")).unwrap();
        insert_message(conn, &test_message("m3", "doc-1", "pat-1", "2026-09-01 09:10:00")).unwrap();
    }

    #[test]
    fn thread_is_oldest_first() {
        let conn = open_memory_database().unwrap();
        seed_thread(&conn);

        let thread = list_thread(&conn, "a1").unwrap();
        assert_eq!(thread.len(), 3);
        assert_eq!(thread[0].id, "m1");
        assert_eq!(thread[2].id, "m3");
    }

    #[test]
    fn reading_a_thread_leaves_messages_unread() {
        let conn = open_memory_database().unwrap();
        seed_thread(&conn);

        let _ = list_thread(&conn, "a1").unwrap();
        assert_eq!(unread_count(&conn, "pat-1").unwrap(), 2);
    }

    #[test]
    fn mark_thread_read_only_touches_recipient() {
        let conn = open_memory_database().unwrap();
        seed_thread(&conn);

        let changed = mark_thread_read(&conn, "a1", "pat-1").unwrap();
        assert_eq!(changed, 2);
        assert_eq!(unread_count(&conn, "pat-1").unwrap(), 0);
        // the doctor's incoming message is untouched
        assert_eq!(unread_count(&conn, "doc-1").unwrap(), 1);

        // second pass is a no-op
        assert_eq!(mark_thread_read(&conn, "a1", "pat-1").unwrap(), 0);
    }

    #[test]
    fn delete_thread_removes_all_messages() {
        let conn = open_memory_database().unwrap();
        seed_thread(&conn);

        assert_eq!(delete_thread(&conn, "a1").unwrap(), 3);
        assert!(list_thread(&conn, "a1").unwrap().is_empty());
    }

    #[test]
    fn delete_single_message() {
        let conn = open_memory_database().unwrap();
        seed_thread(&conn);

        delete_message(&conn, "m2").unwrap();
        assert_eq!(list_thread(&conn, "a1").unwrap().len(), 2);
        assert!(matches!(
            delete_message(&conn, "m2").unwrap_err(),
            DatabaseError::NotFound { .. }
        ));
    }

    #[test]
    fn inbox_orders_by_latest_message() {
        let conn = open_memory_database().unwrap();
        seed_participants(&conn);
        insert_appointment(&conn, &test_appointment("a1", "2026-09-10", "10:30")).unwrap();
        insert_appointment(&conn, &test_appointment("a2", "2026-09-11", "10:30")).unwrap();

        let mut early = test_message("m1", "pat-1", "doc-1", "2026-09-01 09:00:00");
        early.appointment_id = "a2".into();
        insert_message(&conn, &early).unwrap();
        insert_message(&conn, &test_message("m2", "pat-1", "doc-1", "2026-09-02 09:00:00")).unwrap();

        let threads = thread_ids_for_user(&conn, "pat-1").unwrap();
        assert_eq!(threads, vec!["a1".to_string(), "a2".to_string()]);
    }
}
