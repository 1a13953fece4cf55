use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account role. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Doctor => "doctor",
            Self::Admin => "admin",
        }
    }

    /// Parse a role from its wire name. Only patient and doctor may be
    /// chosen at self-registration; admin accounts come from the
    /// bootstrap path.
    pub fn parse_registrable(s: &str) -> Option<Self> {
        match s {
            "patient" => Some(Self::Patient),
            "doctor" => Some(Self::Doctor),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Appointment lifecycle status. Cancelled appointments release their slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Approved,
    Cancelled,
}

impl AppointmentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approved" => Some(Self::Approved),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A patient, doctor, or admin account record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub specialization: Option<String>,
    pub approved: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Identity as returned by the API (never exposes the password hash).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    pub approved: bool,
    pub created_at: String,
}

impl From<Identity> for IdentityResponse {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            name: identity.name,
            email: identity.email,
            role: identity.role,
            specialization: identity.specialization,
            approved: identity.approved,
            created_at: identity.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    pub doctor_id: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub age: i64,
    pub gender: String,
    pub address: String,
    pub reason_for_visit: String,
    pub medical_record: Option<String>,
    pub prescription: Option<String>,
    pub doctor_prescription: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Doctor name/email resolved for response enrichment. The appointment row
/// itself only stores the doctor id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorInfo {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Appointment as returned by the API, with the doctor reference resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    /// None when the referenced doctor identity has since been deleted
    pub doctor: Option<DoctorInfo>,
    pub appointment_date: String,
    pub appointment_time: String,
    pub age: i64,
    pub gender: String,
    pub address: String,
    pub reason_for_visit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_record: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_prescription: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl AppointmentResponse {
    pub fn from_parts(appointment: Appointment, doctor: Option<DoctorInfo>) -> Self {
        Self {
            id: appointment.id,
            first_name: appointment.first_name,
            last_name: appointment.last_name,
            phone_number: appointment.phone_number,
            email: appointment.email,
            doctor,
            appointment_date: appointment.appointment_date,
            appointment_time: appointment.appointment_time,
            age: appointment.age,
            gender: appointment.gender,
            address: appointment.address,
            reason_for_visit: appointment.reason_for_visit,
            medical_record: appointment.medical_record,
            prescription: appointment.prescription,
            doctor_prescription: appointment.doctor_prescription,
            status: appointment.status,
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
        }
    }
}

// DTOs for API

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "type")]
    pub role: String,
    pub specialization: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "type")]
    pub role: Option<String>,
    pub specialization: Option<String>,
    pub approved: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    pub doctor: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub age: i64,
    pub gender: String,
    pub address: String,
    pub reason_for_visit: String,
    pub medical_record: Option<String>,
    pub prescription: Option<String>,
    pub doctor_prescription: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub doctor: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub reason_for_visit: Option<String>,
    pub medical_record: Option<String>,
    pub prescription: Option<String>,
    pub doctor_prescription: Option<String>,
    pub status: Option<String>,
}
