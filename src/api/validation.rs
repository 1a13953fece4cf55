//! Input validation for API requests.
//!
//! Field validators return a message for the offending field; handlers map
//! them to 400 responses. Role and status strings are parsed here once, at
//! the boundary, so the rest of the crate works with closed enums.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::{AppointmentStatus, Role};

lazy_static! {
    /// Regex for validating email addresses
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$"
    ).unwrap();

    /// Regex for validating time-of-day slots (24h HH:MM)
    static ref TIME_REGEX: Regex = Regex::new(
        r"^([01][0-9]|2[0-3]):[0-5][0-9]$"
    ).unwrap();
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }

    Ok(())
}

/// Validate a person's name
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name is required".to_string());
    }

    if name.len() > 120 {
        return Err("Name is too long (max 120 characters)".to_string());
    }

    Ok(())
}

/// Validate a password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 6 {
        return Err("Password must be at least 6 characters".to_string());
    }

    Ok(())
}

/// Parse the account type for self-registration. Admin accounts are
/// created through the bootstrap path, never here.
pub fn validate_registration_role(role: &str) -> Result<Role, String> {
    Role::parse_registrable(role)
        .ok_or_else(|| "Type must be either 'patient' or 'doctor'".to_string())
}

/// Specialization must be present if and only if the role is doctor
pub fn validate_specialization(
    role: Role,
    specialization: &Option<String>,
) -> Result<(), String> {
    let has_value = specialization
        .as_ref()
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false);

    match role {
        Role::Doctor if !has_value => Err("Specialization is required for doctors".to_string()),
        Role::Patient | Role::Admin if has_value => {
            Err("Specialization is only valid for doctors".to_string())
        }
        _ => Ok(()),
    }
}

/// Validate a required free-text field
pub fn validate_required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }
    Ok(())
}

/// Validate a patient age
pub fn validate_age(age: i64) -> Result<(), String> {
    if age <= 0 {
        return Err("Age must be a positive number".to_string());
    }
    if age > 150 {
        return Err("Age is out of range".to_string());
    }
    Ok(())
}

/// Validate a time-of-day slot
pub fn validate_time(time: &str) -> Result<(), String> {
    if time.is_empty() {
        return Err("Appointment time is required".to_string());
    }

    if !TIME_REGEX.is_match(time) {
        return Err("Appointment time must be in HH:MM format".to_string());
    }

    Ok(())
}

/// Parse an appointment status, defaulting to approved when absent
pub fn validate_status(status: &Option<String>) -> Result<AppointmentStatus, String> {
    match status {
        None => Ok(AppointmentStatus::Approved),
        Some(s) => AppointmentStatus::parse(s)
            .ok_or_else(|| "Status must be either 'approved' or 'cancelled'".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("kofi@example.com").is_ok());
        assert!(validate_email("dr.mensah+clinic@health.org").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("missing@tld").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Ama Mensah").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret1").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_validate_registration_role() {
        assert_eq!(validate_registration_role("patient").unwrap(), Role::Patient);
        assert_eq!(validate_registration_role("doctor").unwrap(), Role::Doctor);

        assert!(validate_registration_role("admin").is_err());
        assert!(validate_registration_role("nurse").is_err());
        assert!(validate_registration_role("").is_err());
    }

    #[test]
    fn test_validate_specialization() {
        let some = Some("cardiology".to_string());
        let blank = Some("  ".to_string());

        assert!(validate_specialization(Role::Doctor, &some).is_ok());
        assert!(validate_specialization(Role::Doctor, &None).is_err());
        assert!(validate_specialization(Role::Doctor, &blank).is_err());

        assert!(validate_specialization(Role::Patient, &None).is_ok());
        assert!(validate_specialization(Role::Patient, &some).is_err());
    }

    #[test]
    fn test_validate_age() {
        assert!(validate_age(1).is_ok());
        assert!(validate_age(34).is_ok());

        assert!(validate_age(0).is_err());
        assert!(validate_age(-5).is_err());
        assert!(validate_age(200).is_err());
    }

    #[test]
    fn test_validate_time() {
        assert!(validate_time("00:00").is_ok());
        assert!(validate_time("09:30").is_ok());
        assert!(validate_time("23:59").is_ok());

        assert!(validate_time("").is_err());
        assert!(validate_time("24:00").is_err());
        assert!(validate_time("9:30").is_err());
        assert!(validate_time("09:60").is_err());
        assert!(validate_time("morning").is_err());
    }

    #[test]
    fn test_validate_status() {
        assert_eq!(validate_status(&None).unwrap(), AppointmentStatus::Approved);
        assert_eq!(
            validate_status(&Some("cancelled".to_string())).unwrap(),
            AppointmentStatus::Cancelled
        );
        assert!(validate_status(&Some("pending".to_string())).is_err());
    }
}
