//! User-facing identity endpoints: registration, login, the approval
//! workflow, and admin-side user management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::auth::{hash_password, issue_token, verify_password};
use super::error::ApiError;
use super::validation::{
    validate_email, validate_name, validate_password, validate_registration_role,
    validate_specialization,
};
use crate::db::{
    self, IdentityResponse, LoginRequest, RegisterUserRequest, Role, UpdatePatientRequest,
    UpdateUserRequest,
};
use crate::AppState;

/// Envelope for responses that carry a message alongside the user
#[derive(Debug, Serialize, Deserialize)]
pub struct MsgUserResponse {
    pub msg: String,
    pub user: IdentityResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MsgResponse {
    pub msg: String,
}

/// Subset of the identity returned on login
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub role: Role,
    pub approved: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponse {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountsResponse {
    pub total_users: i64,
    pub total_doctors: i64,
    pub total_patients: i64,
}

#[derive(Debug, Deserialize)]
pub struct RegisterDoctorRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub specialization: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPatientRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

fn email_conflict(err: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.message().contains("UNIQUE constraint failed") {
            return ApiError::conflict("Email already registered");
        }
    }
    ApiError::from(err)
}

fn hash_or_internal(password: &str) -> Result<String, ApiError> {
    hash_password(password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::internal("Server error")
    })
}

/// Register a new user (patient or doctor). Self-registered accounts start
/// unapproved and cannot log in until an admin approves them.
///
/// POST /api/user/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<Json<IdentityResponse>, ApiError> {
    validate_name(&req.name).map_err(ApiError::bad_request)?;
    validate_email(&req.email).map_err(ApiError::bad_request)?;
    validate_password(&req.password).map_err(ApiError::bad_request)?;
    let role = validate_registration_role(&req.role).map_err(ApiError::bad_request)?;
    validate_specialization(role, &req.specialization).map_err(ApiError::bad_request)?;

    let password_hash = hash_or_internal(&req.password)?;
    let specialization = match role {
        Role::Doctor => req.specialization.as_deref(),
        _ => None,
    };

    let identity = db::create_identity(
        &state.db,
        &req.name,
        &req.email,
        &password_hash,
        role,
        specialization,
        false,
    )
    .await
    .map_err(email_conflict)?;

    info!(email = %identity.email, role = %identity.role, "User registered, pending approval");

    Ok(Json(IdentityResponse::from(identity)))
}

/// User login. The gating order is deliberate: unknown email, then
/// approval, then the password check, so an unapproved user with a wrong
/// password still learns "not approved" rather than "invalid credentials".
///
/// POST /api/user/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<UserLoginResponse>, ApiError> {
    let user = db::find_identity_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !user.approved {
        return Err(ApiError::unauthorized("User not approved"));
    }

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::bad_request("Invalid credentials"));
    }

    let token = issue_token(
        &state.config.auth.jwt_secret,
        &user.id,
        user.role,
        state.config.auth.login_ttl_hours,
    )
    .map_err(|e| {
        tracing::error!("Failed to sign token: {}", e);
        ApiError::internal("Server error")
    })?;

    Ok(Json(UserLoginResponse {
        token,
        user: LoginUser {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            approved: user.approved,
        },
    }))
}

/// Approve a user. One-way and idempotent.
///
/// PATCH /api/user/approve/:id
pub async fn approve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MsgUserResponse>, ApiError> {
    let user = db::approve_identity(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user = %user.email, "User approved");

    Ok(Json(MsgUserResponse {
        msg: "User approval status updated successfully".to_string(),
        user: IdentityResponse::from(user),
    }))
}

/// GET /api/user/unapproved
pub async fn unapproved(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<IdentityResponse>>, ApiError> {
    let users = db::list_by_approval(&state.db, false).await?;

    if users.is_empty() {
        return Err(ApiError::not_found("No unapproved users found"));
    }

    Ok(Json(users.into_iter().map(IdentityResponse::from).collect()))
}

/// GET /api/user/approved-doctors
pub async fn approved_doctors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<IdentityResponse>>, ApiError> {
    let doctors = db::list_approved_by_role(&state.db, Role::Doctor).await?;

    if doctors.is_empty() {
        return Err(ApiError::not_found("No approved doctors found"));
    }

    Ok(Json(doctors.into_iter().map(IdentityResponse::from).collect()))
}

/// GET /api/user/approved-patients
pub async fn approved_patients(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<IdentityResponse>>, ApiError> {
    let patients = db::list_approved_by_role(&state.db, Role::Patient).await?;
    Ok(Json(patients.into_iter().map(IdentityResponse::from).collect()))
}

/// Dashboard counts. Doctor and patient totals are approved-only.
///
/// GET /api/user/counts
pub async fn counts(State(state): State<Arc<AppState>>) -> Result<Json<CountsResponse>, ApiError> {
    let total_users = db::count_identities(&state.db).await?;
    let total_doctors = db::count_by_role(&state.db, Role::Doctor, true).await?;
    let total_patients = db::count_by_role(&state.db, Role::Patient, true).await?;

    Ok(Json(CountsResponse {
        total_users,
        total_doctors,
        total_patients,
    }))
}

/// DELETE /api/user/:id and /api/user/delete/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MsgResponse>, ApiError> {
    if !db::delete_identity(&state.db, &id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(Json(MsgResponse {
        msg: "User deleted successfully".to_string(),
    }))
}

/// Admin edit of any identity field. Absent fields keep their value.
///
/// PUT /api/user/:id
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<MsgUserResponse>, ApiError> {
    let mut user = db::find_identity_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(name) = req.name {
        validate_name(&name).map_err(ApiError::bad_request)?;
        user.name = name;
    }
    if let Some(email) = req.email {
        validate_email(&email).map_err(ApiError::bad_request)?;
        user.email = email;
    }
    if let Some(role) = req.role {
        user.role = validate_registration_role(&role).map_err(ApiError::bad_request)?;
    }
    match user.role {
        Role::Doctor => {
            if let Some(specialization) = req.specialization {
                user.specialization = Some(specialization);
            }
        }
        // Role changed away from doctor: the specialization no longer applies
        Role::Patient | Role::Admin => user.specialization = None,
    }
    if let Some(approved) = req.approved {
        user.approved = approved;
    }
    if let Some(password) = req.password {
        validate_password(&password).map_err(ApiError::bad_request)?;
        user.password_hash = hash_or_internal(&password)?;
    }

    if !db::save_identity(&state.db, &user).await.map_err(email_conflict)? {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(Json(MsgUserResponse {
        msg: "User updated successfully".to_string(),
        user: IdentityResponse::from(user),
    }))
}

/// Limited self-service edit: name, email, password.
///
/// PUT /api/user/update-patient/:id
pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePatientRequest>,
) -> Result<Json<IdentityResponse>, ApiError> {
    let mut user = db::find_identity_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(name) = req.name {
        validate_name(&name).map_err(ApiError::bad_request)?;
        user.name = name;
    }
    if let Some(email) = req.email {
        validate_email(&email).map_err(ApiError::bad_request)?;
        user.email = email;
    }
    if let Some(password) = req.password {
        validate_password(&password).map_err(ApiError::bad_request)?;
        user.password_hash = hash_or_internal(&password)?;
    }

    if !db::save_identity(&state.db, &user).await.map_err(email_conflict)? {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(Json(IdentityResponse::from(user)))
}

/// Register a doctor directly as approved, skipping the approval queue.
///
/// POST /api/user/register-doctor
pub async fn register_doctor(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterDoctorRequest>,
) -> Result<(StatusCode, Json<MsgUserResponse>), ApiError> {
    validate_name(&req.name).map_err(ApiError::bad_request)?;
    validate_email(&req.email).map_err(ApiError::bad_request)?;
    validate_password(&req.password).map_err(ApiError::bad_request)?;
    let specialization = Some(req.specialization.clone());
    validate_specialization(Role::Doctor, &specialization).map_err(ApiError::bad_request)?;

    let password_hash = hash_or_internal(&req.password)?;
    let doctor = db::create_identity(
        &state.db,
        &req.name,
        &req.email,
        &password_hash,
        Role::Doctor,
        Some(&req.specialization),
        true,
    )
    .await
    .map_err(email_conflict)?;

    info!(email = %doctor.email, "Doctor registered and approved");

    Ok((
        StatusCode::CREATED,
        Json(MsgUserResponse {
            msg: "Doctor registered and approved successfully".to_string(),
            user: IdentityResponse::from(doctor),
        }),
    ))
}

/// Register a patient directly as approved.
///
/// POST /api/user/register-approved-patient
pub async fn register_approved_patient(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterPatientRequest>,
) -> Result<(StatusCode, Json<MsgUserResponse>), ApiError> {
    validate_name(&req.name).map_err(ApiError::bad_request)?;
    validate_email(&req.email).map_err(ApiError::bad_request)?;
    validate_password(&req.password).map_err(ApiError::bad_request)?;

    let password_hash = hash_or_internal(&req.password)?;
    let patient = db::create_identity(
        &state.db,
        &req.name,
        &req.email,
        &password_hash,
        Role::Patient,
        None,
        true,
    )
    .await
    .map_err(email_conflict)?;

    info!(email = %patient.email, "Patient registered and approved");

    Ok((
        StatusCode::CREATED,
        Json(MsgUserResponse {
            msg: "Patient registered and approved successfully".to_string(),
            user: IdentityResponse::from(patient),
        }),
    ))
}
