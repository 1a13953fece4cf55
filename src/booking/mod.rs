//! Booking invariants, enforced in one place before the appointment store
//! is mutated.
//!
//! Three rules gate every booking: the doctor reference must resolve to an
//! identity with the doctor role, the appointment date may not lie in the
//! past (create only), and a doctor's slot can only be held by one live
//! appointment. The slot rule is also backed by a unique index, so a write
//! racing past the pre-check fails at the store instead of double-booking.

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::db::{self, Role};

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Doctor not found")]
    DoctorNotFound,
    #[error("Cannot book an appointment for a past date")]
    PastDate,
    #[error("Appointment slot already booked")]
    SlotTaken,
    #[error("Appointment not found")]
    NotFound,
    #[error("Invalid appointment date")]
    InvalidDate,
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

/// Parse a calendar date in the wire format, dropping any time-of-day.
fn parse_date(raw: &str) -> Result<NaiveDate, BookingError> {
    // Accept plain dates and RFC 3339 datetimes, both of which the
    // dashboard has been observed to send
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(datetime.date_naive());
    }
    Err(BookingError::InvalidDate)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Date-only comparison: booking for today is allowed, any earlier
/// calendar date is rejected regardless of time-of-day.
fn ensure_not_past(selected: NaiveDate, today: NaiveDate) -> Result<(), BookingError> {
    if selected < today {
        return Err(BookingError::PastDate);
    }
    Ok(())
}

async fn resolve_doctor(pool: &SqlitePool, doctor_id: &str) -> Result<(), BookingError> {
    match db::find_identity_by_id(pool, doctor_id).await? {
        Some(identity) => match identity.role {
            Role::Doctor => Ok(()),
            Role::Patient | Role::Admin => Err(BookingError::DoctorNotFound),
        },
        None => Err(BookingError::DoctorNotFound),
    }
}

/// Validate a booking request before creation.
pub async fn validate_create(
    pool: &SqlitePool,
    doctor_id: &str,
    date: &str,
    time: &str,
) -> Result<(), BookingError> {
    resolve_doctor(pool, doctor_id).await?;

    let selected = parse_date(date)?;
    ensure_not_past(selected, today())?;

    if db::find_conflicting(pool, doctor_id, date, time, None)
        .await?
        .is_some()
    {
        return Err(BookingError::SlotTaken);
    }

    Ok(())
}

/// Validate a reschedule/update. The conflict query excludes the record
/// being updated, so keeping the current slot is never a self-conflict.
/// The past-date rule is intentionally not re-applied here: edits to
/// historical appointments (prescriptions on past visits) must go through.
pub async fn validate_update(
    pool: &SqlitePool,
    appointment_id: &str,
    doctor_id: &str,
    date: &str,
    time: &str,
) -> Result<(), BookingError> {
    resolve_doctor(pool, doctor_id).await?;

    parse_date(date)?;

    if db::find_conflicting(pool, doctor_id, date, time, Some(appointment_id))
        .await?
        .is_some()
    {
        return Err(BookingError::SlotTaken);
    }

    Ok(())
}
