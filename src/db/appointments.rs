use sqlx::SqlitePool;
use uuid::Uuid;

use super::identities::now_rfc3339;
use super::models::{Appointment, AppointmentStatus, CreateAppointmentRequest, DoctorInfo};

pub async fn create_appointment(
    pool: &SqlitePool,
    req: &CreateAppointmentRequest,
    status: AppointmentStatus,
) -> Result<Appointment, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = now_rfc3339();

    sqlx::query(
        "INSERT INTO appointments (id, first_name, last_name, phone_number, email, doctor_id,
             appointment_date, appointment_time, age, gender, address, reason_for_visit,
             medical_record, prescription, doctor_prescription, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.phone_number)
    .bind(&req.email)
    .bind(&req.doctor)
    .bind(&req.appointment_date)
    .bind(&req.appointment_time)
    .bind(req.age)
    .bind(&req.gender)
    .bind(&req.address)
    .bind(&req.reason_for_visit)
    .bind(&req.medical_record)
    .bind(&req.prescription)
    .bind(&req.doctor_prescription)
    .bind(status)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(Appointment {
        id,
        first_name: req.first_name.clone(),
        last_name: req.last_name.clone(),
        phone_number: req.phone_number.clone(),
        email: req.email.clone(),
        doctor_id: req.doctor.clone(),
        appointment_date: req.appointment_date.clone(),
        appointment_time: req.appointment_time.clone(),
        age: req.age,
        gender: req.gender.clone(),
        address: req.address.clone(),
        reason_for_visit: req.reason_for_visit.clone(),
        medical_record: req.medical_record.clone(),
        prescription: req.prescription.clone(),
        doctor_prescription: req.doctor_prescription.clone(),
        status,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn find_appointment_by_id(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<Appointment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM appointments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_appointments(pool: &SqlitePool) -> Result<Vec<Appointment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM appointments ORDER BY created_at")
        .fetch_all(pool)
        .await
}

/// Persist every mutable field of an appointment. Returns false when the
/// row no longer exists.
pub async fn save_appointment(
    pool: &SqlitePool,
    appointment: &Appointment,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE appointments
         SET first_name = ?, last_name = ?, phone_number = ?, email = ?, doctor_id = ?,
             appointment_date = ?, appointment_time = ?, age = ?, gender = ?, address = ?,
             reason_for_visit = ?, medical_record = ?, prescription = ?, doctor_prescription = ?,
             status = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&appointment.first_name)
    .bind(&appointment.last_name)
    .bind(&appointment.phone_number)
    .bind(&appointment.email)
    .bind(&appointment.doctor_id)
    .bind(&appointment.appointment_date)
    .bind(&appointment.appointment_time)
    .bind(appointment.age)
    .bind(&appointment.gender)
    .bind(&appointment.address)
    .bind(&appointment.reason_for_visit)
    .bind(&appointment.medical_record)
    .bind(&appointment.prescription)
    .bind(&appointment.doctor_prescription)
    .bind(appointment.status)
    .bind(now_rfc3339())
    .bind(&appointment.id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_appointment(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_appointments(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM appointments")
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

/// Find a live appointment occupying the given slot. `exclude_id` skips the
/// record under update so it does not conflict with itself.
pub async fn find_conflicting(
    pool: &SqlitePool,
    doctor_id: &str,
    date: &str,
    time: &str,
    exclude_id: Option<&str>,
) -> Result<Option<Appointment>, sqlx::Error> {
    match exclude_id {
        Some(id) => {
            sqlx::query_as(
                "SELECT * FROM appointments
                 WHERE doctor_id = ? AND appointment_date = ? AND appointment_time = ?
                   AND status <> 'cancelled' AND id <> ?",
            )
            .bind(doctor_id)
            .bind(date)
            .bind(time)
            .bind(id)
            .fetch_optional(pool)
            .await
        }
        None => {
            sqlx::query_as(
                "SELECT * FROM appointments
                 WHERE doctor_id = ? AND appointment_date = ? AND appointment_time = ?
                   AND status <> 'cancelled'",
            )
            .bind(doctor_id)
            .bind(date)
            .bind(time)
            .fetch_optional(pool)
            .await
        }
    }
}

/// Resolve the doctor name/email for response enrichment.
pub async fn doctor_info(
    pool: &SqlitePool,
    doctor_id: &str,
) -> Result<Option<DoctorInfo>, sqlx::Error> {
    let row: Option<(String, String, String)> =
        sqlx::query_as("SELECT id, name, email FROM identities WHERE id = ?")
            .bind(doctor_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.map(|(id, name, email)| DoctorInfo { id, name, email }))
}
