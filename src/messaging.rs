//! Per-appointment message threads between the patient and the doctor.
//!
//! Reading a thread never changes read state. Marking is an explicit call,
//! so an unread badge only clears when the client says the user saw it.

use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::{Appointment, AppointmentMessage, User};

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("conversation not found")]
    NotFound,
    #[error("not a participant in this conversation")]
    Forbidden,
    #[error("{0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// One row of a user's conversation inbox.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadSummary {
    pub appointment_id: String,
    pub other_party_id: String,
    pub other_party_name: String,
    pub last_message: String,
    pub last_message_at: chrono::NaiveDateTime,
    pub unread_count: i64,
}

fn appointment_for_participant(
    conn: &Connection,
    user: &User,
    appointment_id: &str,
) -> Result<Appointment, MessagingError> {
    repository::get_appointment(conn, appointment_id)?
        .filter(|a| a.is_participant(&user.id))
        .ok_or(MessagingError::NotFound)
}

/// Send a message in an appointment thread. The recipient is always the
/// other participant.
pub fn send(
    conn: &Connection,
    sender: &User,
    appointment_id: &str,
    body: &str,
) -> Result<AppointmentMessage, MessagingError> {
    if body.trim().is_empty() {
        return Err(MessagingError::InvalidRequest("message body is empty".into()));
    }
    let appointment = appointment_for_participant(conn, sender, appointment_id)?;
    let recipient_id = if appointment.patient_id == sender.id {
        appointment.doctor_id.clone()
    } else {
        appointment.patient_id.clone()
    };

    let message = AppointmentMessage {
        id: Uuid::new_v4().to_string(),
        appointment_id: appointment_id.to_string(),
        sender_id: sender.id.clone(),
        recipient_id,
        body: body.trim().to_string(),
        is_read: false,
        created_at: chrono::Local::now().naive_local(),
    };
    repository::insert_message(conn, &message)?;
    Ok(message)
}

/// Full thread, oldest first. Does not touch read state.
pub fn thread(
    conn: &Connection,
    user: &User,
    appointment_id: &str,
) -> Result<Vec<AppointmentMessage>, MessagingError> {
    appointment_for_participant(conn, user, appointment_id)?;
    Ok(repository::list_thread(conn, appointment_id)?)
}

/// Mark everything addressed to this user in the thread as read. Returns
/// how many messages changed.
pub fn mark_thread_read(
    conn: &Connection,
    user: &User,
    appointment_id: &str,
) -> Result<usize, MessagingError> {
    appointment_for_participant(conn, user, appointment_id)?;
    Ok(repository::mark_thread_read(conn, appointment_id, &user.id)?)
}

/// Conversation inbox: one summary per thread the user participates in,
/// most recently active first.
pub fn inbox(conn: &Connection, user: &User) -> Result<Vec<ThreadSummary>, MessagingError> {
    let mut summaries = Vec::new();
    for appointment_id in repository::thread_ids_for_user(conn, &user.id)? {
        let appointment = match repository::get_appointment(conn, &appointment_id)? {
            Some(a) => a,
            None => continue,
        };
        let messages = repository::list_thread(conn, &appointment_id)?;
        let last = match messages.last() {
            Some(m) => m,
            None => continue,
        };
        let other_party_id = if appointment.patient_id == user.id {
            appointment.doctor_id.clone()
        } else {
            appointment.patient_id.clone()
        };
        let other_party_name = repository::get_user(conn, &other_party_id)?
            .map(|u| u.full_name())
            .unwrap_or_else(|| "Former user".to_string());
        summaries.push(ThreadSummary {
            appointment_id: appointment_id.clone(),
            other_party_id,
            other_party_name,
            last_message: last.body.clone(),
            last_message_at: last.created_at,
            unread_count: repository::unread_count_for_thread(conn, &appointment_id, &user.id)?,
        });
    }
    Ok(summaries)
}

/// Delete one message. Only the sender or the recipient may delete it.
pub fn delete_message(
    conn: &Connection,
    user: &User,
    message_id: &str,
) -> Result<(), MessagingError> {
    let message = repository::get_message(conn, message_id)?.ok_or(MessagingError::NotFound)?;
    if message.sender_id != user.id && message.recipient_id != user.id {
        return Err(MessagingError::NotFound);
    }
    repository::delete_message(conn, message_id)?;
    Ok(())
}

/// Delete an entire conversation the user participates in.
pub fn delete_conversation(
    conn: &Connection,
    user: &User,
    appointment_id: &str,
) -> Result<usize, MessagingError> {
    appointment_for_participant(conn, user, appointment_id)?;
    Ok(repository::delete_thread(conn, appointment_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking;
    use crate::booking::tests::{request_for, seed_doctor, seed_user};
    use crate::db::sqlite::open_memory_database;
    use crate::models::Role;

    fn setup(conn: &mut Connection) -> (User, User, String) {
        let patient = seed_user(conn, "pat-1", Role::Patient);
        let doctor = seed_doctor(conn, "doc-1");
        let appt = booking::book(conn, &patient, &request_for("doc-1")).unwrap();
        (patient, doctor, appt.id)
    }

    #[test]
    fn send_routes_to_other_participant() {
        let mut conn = open_memory_database().unwrap();
        let (patient, doctor, appt_id) = setup(&mut conn);

        let from_patient = send(&conn, &patient, &appt_id, "Hello doctor").unwrap();
        assert_eq!(from_patient.recipient_id, doctor.id);

        let from_doctor = send(&conn, &doctor, &appt_id, "Hello back").unwrap();
        assert_eq!(from_doctor.recipient_id, patient.id);
    }

    #[test]
    fn outsiders_cannot_see_or_send() {
        let mut conn = open_memory_database().unwrap();
        let (_, _, appt_id) = setup(&mut conn);
        let stranger = seed_user(&conn, "pat-2", Role::Patient);

        assert!(matches!(
            send(&conn, &stranger, &appt_id, "Let me in"),
            Err(MessagingError::NotFound)
        ));
        assert!(matches!(thread(&conn, &stranger, &appt_id), Err(MessagingError::NotFound)));
    }

    #[test]
    fn empty_body_rejected() {
        let mut conn = open_memory_database().unwrap();
        let (patient, _, appt_id) = setup(&mut conn);
        assert!(matches!(
            send(&conn, &patient, &appt_id, "   "),
            Err(MessagingError::InvalidRequest(_))
        ));
    }

    #[test]
    fn reading_does_not_mark_marking_does() {
        let mut conn = open_memory_database().unwrap();
        let (patient, doctor, appt_id) = setup(&mut conn);
        send(&conn, &doctor, &appt_id, "Please arrive early").unwrap();

        let messages = thread(&conn, &patient, &appt_id).unwrap();
        assert!(!messages[0].is_read);
        assert_eq!(repository::unread_count(&conn, &patient.id).unwrap(), 1);

        assert_eq!(mark_thread_read(&conn, &patient, &appt_id).unwrap(), 1);
        assert_eq!(repository::unread_count(&conn, &patient.id).unwrap(), 0);
    }

    #[test]
    fn inbox_summarizes_threads() {
        let mut conn = open_memory_database().unwrap();
        let (patient, doctor, appt_id) = setup(&mut conn);
        send(&conn, &patient, &appt_id, "First").unwrap();
        send(&conn, &doctor, &appt_id, "Second").unwrap();

        let inbox = inbox(&conn, &patient).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].appointment_id, appt_id);
        assert_eq!(inbox[0].other_party_id, doctor.id);
        assert_eq!(inbox[0].last_message, "Second");
        assert_eq!(inbox[0].unread_count, 1);
    }

    #[test]
    fn delete_message_scoped_to_participants() {
        let mut conn = open_memory_database().unwrap();
        let (patient, doctor, appt_id) = setup(&mut conn);
        let message = send(&conn, &patient, &appt_id, "Oops").unwrap();
        let stranger = seed_user(&conn, "pat-2", Role::Patient);

        assert!(matches!(
            delete_message(&conn, &stranger, &message.id),
            Err(MessagingError::NotFound)
        ));
        delete_message(&conn, &doctor, &message.id).unwrap();
        assert!(thread(&conn, &patient, &appt_id).unwrap().is_empty());
    }

    #[test]
    fn delete_conversation_clears_thread() {
        let mut conn = open_memory_database().unwrap();
        let (patient, doctor, appt_id) = setup(&mut conn);
        send(&conn, &patient, &appt_id, "One").unwrap();
        send(&conn, &doctor, &appt_id, "Two").unwrap();

        assert_eq!(delete_conversation(&conn, &patient, &appt_id).unwrap(), 2);
        assert!(thread(&conn, &doctor, &appt_id).unwrap().is_empty());
    }
}
