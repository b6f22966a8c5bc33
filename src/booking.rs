//! Appointment lifecycle: booking, status transitions, completion
//! confirmation, acknowledgement and rating.
//!
//! Every status change that another party must learn about writes the
//! notification in the same transaction as the status update, so a crash
//! can never leave a transition without its notification or vice versa.

use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::{
    Appointment, AppointmentStatus, DoctorRating, Notification, NotificationType, Role, User,
};

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("appointment not found")]
    NotFound,
    #[error("not allowed to perform this action")]
    Forbidden,
    #[error("this doctor is not accepting appointments")]
    DoctorUnavailable,
    #[error("cannot change appointment from {} to {}", .from.as_str(), .to.as_str())]
    IllegalTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    #[error("this appointment has already been rated")]
    AlreadyRated,
    #[error("{0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub doctor_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: String,
}

fn notify(
    conn: &Connection,
    user_id: &str,
    kind: NotificationType,
    title: &str,
    body: String,
) -> Result<(), DatabaseError> {
    repository::insert_notification(
        conn,
        &Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            notification_type: kind,
            title: title.to_string(),
            body,
            is_read: false,
            created_at: chrono::Local::now().naive_local(),
            read_at: None,
        },
    )
}

/// Book a new appointment with a doctor. Patients only; the doctor must be
/// approved, active and currently accepting appointments.
pub fn book(
    conn: &mut Connection,
    patient: &User,
    request: &BookingRequest,
) -> Result<Appointment, BookingError> {
    if patient.role != Role::Patient {
        return Err(BookingError::Forbidden);
    }
    if request.reason.trim().is_empty() {
        return Err(BookingError::InvalidRequest("a reason is required".into()));
    }

    let doctor_user = repository::get_user(conn, &request.doctor_id)?
        .filter(|u| u.role == Role::Doctor)
        .ok_or(BookingError::NotFound)?;
    let doctor = repository::get_doctor(conn, &request.doctor_id)?.ok_or(BookingError::NotFound)?;
    if !doctor_user.is_approved || !doctor_user.is_active || !doctor.is_available {
        return Err(BookingError::DoctorUnavailable);
    }

    let now = chrono::Local::now().naive_local();
    let appointment = Appointment {
        id: Uuid::new_v4().to_string(),
        patient_id: patient.id.clone(),
        doctor_id: request.doctor_id.clone(),
        date: request.date,
        time: request.time,
        reason: request.reason.clone(),
        notes: String::new(),
        status: AppointmentStatus::Pending,
        patient_confirmed_completion: false,
        patient_acknowledged: false,
        doctor_acknowledged: false,
        created_at: now,
        updated_at: now,
    };

    let tx = conn.transaction().map_err(DatabaseError::from)?;
    repository::insert_appointment(&tx, &appointment)?;
    notify(
        &tx,
        &appointment.doctor_id,
        NotificationType::AppointmentCreated,
        "New appointment request",
        format!(
            "{} requested an appointment on {} at {}.",
            patient.full_name(),
            appointment.date,
            appointment.time.format("%H:%M"),
        ),
    )?;
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(appointment_id = %appointment.id, doctor_id = %appointment.doctor_id, "appointment booked");
    Ok(appointment)
}

/// Move an appointment to a new status on behalf of its doctor.
///
/// Confirm and cancel notify the patient inside the same transaction as the
/// status change. Completing is silent; the patient sees it when confirming
/// completion.
pub fn doctor_transition(
    conn: &mut Connection,
    doctor: &User,
    appointment_id: &str,
    to: AppointmentStatus,
) -> Result<Appointment, BookingError> {
    if doctor.role != Role::Doctor {
        return Err(BookingError::Forbidden);
    }
    let appointment = repository::get_appointment(conn, appointment_id)?
        .filter(|a| a.doctor_id == doctor.id)
        .ok_or(BookingError::NotFound)?;
    if !appointment.status.can_transition_to(to) {
        return Err(BookingError::IllegalTransition { from: appointment.status, to });
    }

    let tx = conn.transaction().map_err(DatabaseError::from)?;
    repository::update_status(&tx, appointment_id, to)?;
    match to {
        AppointmentStatus::Confirmed => notify(
            &tx,
            &appointment.patient_id,
            NotificationType::AppointmentConfirmed,
            "Appointment confirmed",
            format!(
                "Dr. {} confirmed your appointment on {} at {}.",
                doctor.full_name(),
                appointment.date,
                appointment.time.format("%H:%M"),
            ),
        )?,
        AppointmentStatus::Cancelled => notify(
            &tx,
            &appointment.patient_id,
            NotificationType::AppointmentCancelled,
            "Appointment cancelled",
            format!(
                "Dr. {} cancelled your appointment on {} at {}.",
                doctor.full_name(),
                appointment.date,
                appointment.time.format("%H:%M"),
            ),
        )?,
        _ => {}
    }
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(appointment_id, from = appointment.status.as_str(), to = to.as_str(), "status changed");
    repository::get_appointment(conn, appointment_id)?.ok_or(BookingError::NotFound)
}

/// Cancel an appointment on behalf of its patient. The doctor is notified in
/// the same transaction.
pub fn patient_cancel(
    conn: &mut Connection,
    patient: &User,
    appointment_id: &str,
) -> Result<Appointment, BookingError> {
    let appointment = repository::get_appointment(conn, appointment_id)?
        .filter(|a| a.patient_id == patient.id)
        .ok_or(BookingError::NotFound)?;
    let to = AppointmentStatus::Cancelled;
    if !appointment.status.can_transition_to(to) {
        return Err(BookingError::IllegalTransition { from: appointment.status, to });
    }

    let tx = conn.transaction().map_err(DatabaseError::from)?;
    repository::update_status(&tx, appointment_id, to)?;
    notify(
        &tx,
        &appointment.doctor_id,
        NotificationType::AppointmentCancelled,
        "Appointment cancelled",
        format!(
            "{} cancelled the appointment on {} at {}.",
            patient.full_name(),
            appointment.date,
            appointment.time.format("%H:%M"),
        ),
    )?;
    tx.commit().map_err(DatabaseError::from)?;

    repository::get_appointment(conn, appointment_id)?.ok_or(BookingError::NotFound)
}

/// Change the date, time or reason of an appointment that is still open.
pub fn reschedule(
    conn: &Connection,
    patient: &User,
    appointment_id: &str,
    date: NaiveDate,
    time: NaiveTime,
    reason: &str,
) -> Result<Appointment, BookingError> {
    let appointment = repository::get_appointment(conn, appointment_id)?
        .filter(|a| a.patient_id == patient.id)
        .ok_or(BookingError::NotFound)?;
    if !appointment.status.is_reschedulable() {
        return Err(BookingError::InvalidRequest(format!(
            "a {} appointment cannot be rescheduled",
            appointment.status.as_str()
        )));
    }
    if reason.trim().is_empty() {
        return Err(BookingError::InvalidRequest("a reason is required".into()));
    }

    repository::update_schedule(conn, appointment_id, date, time, reason)?;
    repository::get_appointment(conn, appointment_id)?.ok_or(BookingError::NotFound)
}

/// Patient confirms the visit actually happened. Prerequisite for rating.
pub fn confirm_completion(
    conn: &Connection,
    patient: &User,
    appointment_id: &str,
) -> Result<Appointment, BookingError> {
    let appointment = repository::get_appointment(conn, appointment_id)?
        .filter(|a| a.patient_id == patient.id)
        .ok_or(BookingError::NotFound)?;
    if appointment.status != AppointmentStatus::Completed {
        return Err(BookingError::InvalidRequest(
            "only completed appointments can be confirmed".into(),
        ));
    }

    repository::set_patient_confirmed_completion(conn, appointment_id)?;
    repository::get_appointment(conn, appointment_id)?.ok_or(BookingError::NotFound)
}

/// Either participant files a completed appointment away from their active
/// list. Each side has its own flag.
pub fn acknowledge(
    conn: &Connection,
    user: &User,
    appointment_id: &str,
) -> Result<Appointment, BookingError> {
    let appointment = repository::get_appointment(conn, appointment_id)?
        .filter(|a| a.is_participant(&user.id))
        .ok_or(BookingError::NotFound)?;
    if appointment.status != AppointmentStatus::Completed {
        return Err(BookingError::InvalidRequest(
            "only completed appointments can be acknowledged".into(),
        ));
    }

    repository::set_acknowledged(conn, appointment_id, user.role)?;
    repository::get_appointment(conn, appointment_id)?.ok_or(BookingError::NotFound)
}

/// Rate the doctor for a completed, patient-confirmed appointment. One
/// rating per appointment per patient.
pub fn rate(
    conn: &Connection,
    patient: &User,
    appointment_id: &str,
    stars: u8,
    comment: Option<String>,
) -> Result<DoctorRating, BookingError> {
    if !(1..=5).contains(&stars) {
        return Err(BookingError::InvalidRequest("rating must be between 1 and 5".into()));
    }
    let appointment = repository::get_appointment(conn, appointment_id)?
        .filter(|a| a.patient_id == patient.id)
        .ok_or(BookingError::NotFound)?;
    if appointment.status != AppointmentStatus::Completed {
        return Err(BookingError::InvalidRequest(
            "only completed appointments can be rated".into(),
        ));
    }
    if !appointment.patient_confirmed_completion {
        return Err(BookingError::InvalidRequest(
            "confirm the appointment took place before rating".into(),
        ));
    }

    let rating = DoctorRating {
        id: Uuid::new_v4().to_string(),
        appointment_id: appointment_id.to_string(),
        doctor_id: appointment.doctor_id.clone(),
        patient_id: patient.id.clone(),
        rating: stars,
        comment,
        created_at: chrono::Local::now().naive_local(),
    };
    match repository::insert_rating(conn, &rating) {
        Ok(()) => Ok(rating),
        Err(e) if e.is_unique_violation() => Err(BookingError::AlreadyRated),
        Err(e) => Err(e.into()),
    }
}

/// Fetch an appointment visible to this user. Admins see everything;
/// participants see their own. Anyone else gets a not-found, so the id
/// leaks nothing.
pub fn get_appointment_for_user(
    conn: &Connection,
    user: &User,
    appointment_id: &str,
) -> Result<Appointment, BookingError> {
    repository::get_appointment(conn, appointment_id)?
        .filter(|a| user.role == Role::Admin || a.is_participant(&user.id))
        .ok_or(BookingError::NotFound)
}
