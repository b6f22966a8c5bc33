//! Appointment receipt rendering via `printpdf`. Returns PDF bytes; the API
//! layer decides the filename and headers.

use printpdf::*;
use rusqlite::Connection;
use std::io::BufWriter;

use crate::booking::BookingError;
use crate::db::{repository, DatabaseError};
use crate::models::{Appointment, User};

/// Everything printed on a receipt, resolved up front so rendering is pure.
#[derive(Debug, Clone)]
pub struct ReceiptData {
    pub appointment_id: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub specialization: String,
    pub date: String,
    pub time: String,
    pub status: String,
    pub consultation_fee: f64,
    pub reason: String,
    pub notes: String,
}

fn pdf_error(e: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::ConstraintViolation(format!("PDF error: {e}"))
}

/// Resolve receipt fields for an appointment this user may see.
pub fn receipt_data(
    conn: &Connection,
    user: &User,
    appointment: &Appointment,
) -> Result<ReceiptData, BookingError> {
    if !appointment.is_participant(&user.id) && user.role != crate::models::Role::Admin {
        return Err(BookingError::NotFound);
    }
    let patient =
        repository::get_user(conn, &appointment.patient_id)?.ok_or(BookingError::NotFound)?;
    let doctor_user =
        repository::get_user(conn, &appointment.doctor_id)?.ok_or(BookingError::NotFound)?;
    let doctor =
        repository::get_doctor(conn, &appointment.doctor_id)?.ok_or(BookingError::NotFound)?;

    Ok(ReceiptData {
        appointment_id: appointment.id.clone(),
        patient_name: patient.full_name(),
        doctor_name: format!("Dr. {}", doctor_user.full_name()),
        specialization: doctor.specialization,
        date: appointment.date.format("%Y-%m-%d").to_string(),
        time: appointment.time.format("%H:%M").to_string(),
        status: appointment.status.as_str().to_string(),
        consultation_fee: doctor.consultation_fee,
        reason: appointment.reason.clone(),
        notes: appointment.notes.clone(),
    })
}

/// Render a single-page A4 receipt. Returns PDF bytes.
pub fn generate_receipt_pdf(data: &ReceiptData) -> Result<Vec<u8>, DatabaseError> {
    let (doc, page1, layer1) =
        PdfDocument::new("Appointment Receipt", Mm(210.0), Mm(297.0), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;

    let mut y = Mm(280.0);

    layer.use_text("APPOINTMENT RECEIPT", 16.0, Mm(20.0), y, &bold);
    y -= Mm(6.0);
    layer.use_text(format!("Receipt no. {}", data.appointment_id), 8.0, Mm(20.0), y, &font);
    y -= Mm(12.0);

    let fields = [
        ("Patient", data.patient_name.as_str()),
        ("Doctor", data.doctor_name.as_str()),
        ("Specialization", data.specialization.as_str()),
        ("Date", data.date.as_str()),
        ("Time", data.time.as_str()),
        ("Status", data.status.as_str()),
    ];
    for (label, value) in fields {
        layer.use_text(format!("{label}:"), 10.0, Mm(20.0), y, &bold);
        layer.use_text(value, 10.0, Mm(60.0), y, &font);
        y -= Mm(6.0);
    }

    y -= Mm(4.0);
    layer.use_text("Consultation fee:", 11.0, Mm(20.0), y, &bold);
    layer.use_text(format!("{:.2}", data.consultation_fee), 11.0, Mm(60.0), y, &bold);
    y -= Mm(10.0);

    layer.use_text("Reason for visit:", 10.0, Mm(20.0), y, &bold);
    y -= Mm(5.0);
    for line in wrap_text(&data.reason, 90) {
        layer.use_text(&line, 9.0, Mm(25.0), y, &font);
        y -= Mm(4.5);
    }

    if !data.notes.is_empty() {
        y -= Mm(4.0);
        layer.use_text("Notes:", 10.0, Mm(20.0), y, &bold);
        y -= Mm(5.0);
        for line in wrap_text(&data.notes, 90) {
            layer.use_text(&line, 9.0, Mm(25.0), y, &font);
            y -= Mm(4.5);
        }
    }

    y -= Mm(12.0);
    layer.use_text(
        "This receipt was generated electronically and is valid without a signature.",
        7.0,
        Mm(20.0),
        y,
        &font,
    );

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf).map_err(pdf_error)?;
    buf.into_inner().map_err(pdf_error)
}

/// Simple word-wrap helper for PDF text rendering.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.len() + word.len() + 1 > max_chars && !current.is_empty() {
            lines.push(current.clone());
            current.clear();
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
