//! Appointment endpoints. Every mutation goes through the booking
//! validator before it touches the store; the slot unique index catches
//! anything that races past the pre-check.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use super::validation::{
    validate_age, validate_email, validate_required, validate_status, validate_time,
};
use crate::booking;
use crate::db::{
    self, AppointmentResponse, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentCountResponse {
    pub total_appointments: i64,
}

fn validate_patient_fields(req: &CreateAppointmentRequest) -> Result<(), ApiError> {
    validate_required("First name", &req.first_name).map_err(ApiError::bad_request)?;
    validate_required("Last name", &req.last_name).map_err(ApiError::bad_request)?;
    validate_required("Phone number", &req.phone_number).map_err(ApiError::bad_request)?;
    validate_email(&req.email).map_err(ApiError::bad_request)?;
    validate_age(req.age).map_err(ApiError::bad_request)?;
    validate_required("Gender", &req.gender).map_err(ApiError::bad_request)?;
    validate_required("Address", &req.address).map_err(ApiError::bad_request)?;
    validate_required("Reason for visit", &req.reason_for_visit).map_err(ApiError::bad_request)?;
    validate_time(&req.appointment_time).map_err(ApiError::bad_request)?;
    Ok(())
}

/// The slot index is the backstop for the conflict pre-check; a violation
/// here means a concurrent booking won the slot.
fn slot_conflict(err: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.message().contains("UNIQUE constraint failed") {
            return ApiError::bad_request("Appointment slot already booked");
        }
    }
    ApiError::from(err)
}

async fn enrich(
    state: &AppState,
    appointment: db::Appointment,
) -> Result<AppointmentResponse, ApiError> {
    let doctor = db::doctor_info(&state.db, &appointment.doctor_id).await?;
    Ok(AppointmentResponse::from_parts(appointment, doctor))
}

/// Book an appointment.
///
/// POST /api/appointments
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), ApiError> {
    validate_patient_fields(&req)?;
    let status = validate_status(&req.status).map_err(ApiError::bad_request)?;

    booking::validate_create(
        &state.db,
        &req.doctor,
        &req.appointment_date,
        &req.appointment_time,
    )
    .await?;

    let appointment = db::create_appointment(&state.db, &req, status)
        .await
        .map_err(slot_conflict)?;

    info!(
        doctor = %appointment.doctor_id,
        date = %appointment.appointment_date,
        time = %appointment.appointment_time,
        "Appointment booked"
    );

    let response = enrich(&state, appointment).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/appointments
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AppointmentResponse>>, ApiError> {
    let appointments = db::list_appointments(&state.db).await?;

    let mut responses = Vec::with_capacity(appointments.len());
    for appointment in appointments {
        responses.push(enrich(&state, appointment).await?);
    }

    Ok(Json(responses))
}

/// GET /api/appointments/:id
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let appointment = db::find_appointment_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Appointment not found"))?;

    let response = enrich(&state, appointment).await?;
    Ok(Json(response))
}

/// Reschedule or edit an appointment. Fields left out keep their value.
///
/// PUT /api/appointments/:id
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAppointmentRequest>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let mut appointment = db::find_appointment_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Appointment not found"))?;

    if let Some(first_name) = req.first_name {
        validate_required("First name", &first_name).map_err(ApiError::bad_request)?;
        appointment.first_name = first_name;
    }
    if let Some(last_name) = req.last_name {
        validate_required("Last name", &last_name).map_err(ApiError::bad_request)?;
        appointment.last_name = last_name;
    }
    if let Some(phone_number) = req.phone_number {
        validate_required("Phone number", &phone_number).map_err(ApiError::bad_request)?;
        appointment.phone_number = phone_number;
    }
    if let Some(email) = req.email {
        validate_email(&email).map_err(ApiError::bad_request)?;
        appointment.email = email;
    }
    if let Some(doctor) = req.doctor {
        appointment.doctor_id = doctor;
    }
    if let Some(date) = req.appointment_date {
        appointment.appointment_date = date;
    }
    if let Some(time) = req.appointment_time {
        validate_time(&time).map_err(ApiError::bad_request)?;
        appointment.appointment_time = time;
    }
    if let Some(age) = req.age {
        validate_age(age).map_err(ApiError::bad_request)?;
        appointment.age = age;
    }
    if let Some(gender) = req.gender {
        appointment.gender = gender;
    }
    if let Some(address) = req.address {
        appointment.address = address;
    }
    if let Some(reason) = req.reason_for_visit {
        appointment.reason_for_visit = reason;
    }
    if let Some(medical_record) = req.medical_record {
        appointment.medical_record = Some(medical_record);
    }
    if let Some(prescription) = req.prescription {
        appointment.prescription = Some(prescription);
    }
    if let Some(doctor_prescription) = req.doctor_prescription {
        appointment.doctor_prescription = Some(doctor_prescription);
    }
    if let Some(status) = &req.status {
        appointment.status = validate_status(&Some(status.clone())).map_err(ApiError::bad_request)?;
    }

    booking::validate_update(
        &state.db,
        &appointment.id,
        &appointment.doctor_id,
        &appointment.appointment_date,
        &appointment.appointment_time,
    )
    .await?;

    if !db::save_appointment(&state.db, &appointment)
        .await
        .map_err(slot_conflict)?
    {
        return Err(ApiError::not_found("Appointment not found"));
    }

    let response = enrich(&state, appointment).await?;
    Ok(Json(response))
}

/// DELETE /api/appointments/:id
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !db::delete_appointment(&state.db, &id).await? {
        return Err(ApiError::not_found("Appointment not found"));
    }

    Ok(Json(MessageResponse {
        message: "Appointment deleted".to_string(),
    }))
}

/// GET /api/appointments/count
pub async fn count_appointments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AppointmentCountResponse>, ApiError> {
    let total = db::count_appointments(&state.db).await?;
    Ok(Json(AppointmentCountResponse {
        total_appointments: total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorKind;
    use crate::config::Config;
    use crate::db::{create_identity, Role};
    use chrono::Duration;

    async fn test_state() -> Arc<AppState> {
        let config = Config::default();
        let db = crate::db::init_memory().await;
        Arc::new(AppState::new(config, db))
    }

    async fn seed_doctor(state: &AppState, email: &str) -> String {
        create_identity(
            &state.db,
            "Dr. A",
            email,
            "h",
            Role::Doctor,
            Some("cardiology"),
            true,
        )
        .await
        .unwrap()
        .id
    }

    fn date_from_today(days: i64) -> String {
        (chrono::Local::now().date_naive() + Duration::days(days))
            .format("%Y-%m-%d")
            .to_string()
    }

    fn booking(doctor: &str, date: &str, time: &str) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            first_name: "Kofi".to_string(),
            last_name: "Owusu".to_string(),
            phone_number: "0201234567".to_string(),
            email: "kofi@example.test".to_string(),
            doctor: doctor.to_string(),
            appointment_date: date.to_string(),
            appointment_time: time.to_string(),
            age: 34,
            gender: "male".to_string(),
            address: "12 Ring Road".to_string(),
            reason_for_visit: "chest pains".to_string(),
            medical_record: None,
            prescription: None,
            doctor_prescription: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_booking_succeeds_with_enrichment() {
        let state = test_state().await;
        let doctor = seed_doctor(&state, "dra@c.test").await;
        let date = date_from_today(7);

        let (status, Json(appt)) = create_appointment(
            State(state.clone()),
            Json(booking(&doctor, &date, "10:00")),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(appt.status, crate::db::AppointmentStatus::Approved);
        let enriched = appt.doctor.unwrap();
        assert_eq!(enriched.name, "Dr. A");
        assert_eq!(enriched.email, "dra@c.test");
    }

    #[tokio::test]
    async fn test_double_booking_rejected() {
        let state = test_state().await;
        let doctor = seed_doctor(&state, "dra@c.test").await;
        let date = date_from_today(7);

        create_appointment(State(state.clone()), Json(booking(&doctor, &date, "10:00")))
            .await
            .unwrap();

        let err = create_appointment(State(state.clone()), Json(booking(&doctor, &date, "10:00")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.message(), "Appointment slot already booked");
    }

    #[tokio::test]
    async fn test_past_date_rejected() {
        let state = test_state().await;
        let doctor = seed_doctor(&state, "dra@c.test").await;

        let err = create_appointment(
            State(state.clone()),
            Json(booking(&doctor, &date_from_today(-1), "10:00")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.message(), "Cannot book an appointment for a past date");
    }

    #[tokio::test]
    async fn test_unknown_doctor_rejected() {
        let state = test_state().await;

        let err = create_appointment(
            State(state.clone()),
            Json(booking("no-such-doctor", &date_from_today(1), "10:00")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "Doctor not found");
    }

    #[tokio::test]
    async fn test_update_self_slot_ok_foreign_slot_rejected() {
        let state = test_state().await;
        let doctor = seed_doctor(&state, "dra@c.test").await;
        let date = date_from_today(7);

        let (_, Json(first)) = create_appointment(
            State(state.clone()),
            Json(booking(&doctor, &date, "10:00")),
        )
        .await
        .unwrap();
        let (_, Json(second)) = create_appointment(
            State(state.clone()),
            Json(booking(&doctor, &date, "11:00")),
        )
        .await
        .unwrap();

        // Updating onto its own slot is not a self-conflict
        let updated = update_appointment(
            State(state.clone()),
            Path(first.id.clone()),
            Json(UpdateAppointmentRequest {
                appointment_time: Some("10:00".to_string()),
                prescription: Some("amoxicillin".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.0.prescription.as_deref(), Some("amoxicillin"));

        // Moving onto the other appointment's slot is
        let err = update_appointment(
            State(state.clone()),
            Path(second.id.clone()),
            Json(UpdateAppointmentRequest {
                appointment_time: Some("10:00".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.message(), "Appointment slot already booked");
    }

    #[tokio::test]
    async fn test_cancelling_frees_the_slot() {
        let state = test_state().await;
        let doctor = seed_doctor(&state, "dra@c.test").await;
        let date = date_from_today(7);

        let (_, Json(first)) = create_appointment(
            State(state.clone()),
            Json(booking(&doctor, &date, "10:00")),
        )
        .await
        .unwrap();

        update_appointment(
            State(state.clone()),
            Path(first.id.clone()),
            Json(UpdateAppointmentRequest {
                status: Some("cancelled".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        // The slot is free for a new booking now
        create_appointment(State(state.clone()), Json(booking(&doctor, &date, "10:00")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_update_delete_unknown_id() {
        let state = test_state().await;

        let err = get_appointment(State(state.clone()), Path("missing".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = update_appointment(
            State(state.clone()),
            Path("missing".to_string()),
            Json(UpdateAppointmentRequest::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = delete_appointment(State(state.clone()), Path("missing".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let state = test_state().await;
        let doctor = seed_doctor(&state, "dra@c.test").await;

        create_appointment(
            State(state.clone()),
            Json(booking(&doctor, &date_from_today(1), "09:00")),
        )
        .await
        .unwrap();
        create_appointment(
            State(state.clone()),
            Json(booking(&doctor, &date_from_today(1), "10:00")),
        )
        .await
        .unwrap();

        let Json(all) = list_appointments(State(state.clone())).await.unwrap();
        assert_eq!(all.len(), 2);

        let Json(count) = count_appointments(State(state.clone())).await.unwrap();
        assert_eq!(count.total_appointments, 2);
    }

    #[tokio::test]
    async fn test_validation_rejects_bad_fields() {
        let state = test_state().await;
        let doctor = seed_doctor(&state, "dra@c.test").await;

        let mut bad_age = booking(&doctor, &date_from_today(1), "10:00");
        bad_age.age = 0;
        let err = create_appointment(State(state.clone()), Json(bad_age))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let mut bad_time = booking(&doctor, &date_from_today(1), "10:00");
        bad_time.appointment_time = "sometime".to_string();
        let err = create_appointment(State(state.clone()), Json(bad_time))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let mut bad_status = booking(&doctor, &date_from_today(1), "10:00");
        bad_status.status = Some("pending".to_string());
        let err = create_appointment(State(state.clone()), Json(bad_status))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }
}
