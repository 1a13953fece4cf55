//! Admin bootstrap and session endpoints.
//!
//! The first registration creates the only admin identity; the check is a
//! read-then-write, so the single-admin unique index is what actually
//! guarantees no second admin row can land.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::auth::{hash_password, issue_token, verify_password, Claims};
use super::error::ApiError;
use super::users::MsgResponse;
use super::validation::{validate_email, validate_name, validate_password};
use crate::db::{self, LoginRequest, Role};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterAdminRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminTokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminInfo {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminLoginResponse {
    pub token: String,
    pub admin: AdminInfo,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub email: String,
    pub new_password: String,
    pub confirm_password: String,
}

fn admin_create_conflict(err: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        let msg = db_err.message();
        // The single-admin index reports the role column; plain email
        // duplicates report the email column
        if msg.contains("identities.role") {
            return ApiError::bad_request("Admin already exists");
        }
        if msg.contains("UNIQUE constraint failed") {
            return ApiError::conflict("Email already registered");
        }
    }
    ApiError::from(err)
}

/// Register the first (and only) admin. Issues a short-lived token; the
/// TTL differs from the login TTL by configured policy.
///
/// POST /api/admin/register
pub async fn register_admin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterAdminRequest>,
) -> Result<Json<AdminTokenResponse>, ApiError> {
    if db::admin_exists(&state.db).await? {
        return Err(ApiError::bad_request("Admin already exists"));
    }

    validate_name(&req.name).map_err(ApiError::bad_request)?;
    validate_email(&req.email).map_err(ApiError::bad_request)?;
    validate_password(&req.password).map_err(ApiError::bad_request)?;

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::internal("Server error")
    })?;

    let admin = db::create_identity(
        &state.db,
        &req.name,
        &req.email,
        &password_hash,
        Role::Admin,
        None,
        true,
    )
    .await
    .map_err(admin_create_conflict)?;

    info!(email = %admin.email, "Admin account created");

    let token = issue_token(
        &state.config.auth.jwt_secret,
        &admin.id,
        Role::Admin,
        state.config.auth.admin_register_ttl_hours,
    )
    .map_err(|e| {
        tracing::error!("Failed to sign token: {}", e);
        ApiError::internal("Server error")
    })?;

    Ok(Json(AdminTokenResponse { token }))
}

/// POST /api/admin/login
pub async fn login_admin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AdminLoginResponse>, ApiError> {
    let admin = db::find_identity_by_email(&state.db, &req.email)
        .await?
        .filter(|identity| identity.role == Role::Admin)
        .ok_or_else(|| ApiError::not_found("Admin not found"))?;

    if !verify_password(&req.password, &admin.password_hash) {
        return Err(ApiError::bad_request("Invalid credentials"));
    }

    let token = issue_token(
        &state.config.auth.jwt_secret,
        &admin.id,
        Role::Admin,
        state.config.auth.login_ttl_hours,
    )
    .map_err(|e| {
        tracing::error!("Failed to sign token: {}", e);
        ApiError::internal("Server error")
    })?;

    Ok(Json(AdminLoginResponse {
        token,
        admin: AdminInfo {
            id: admin.id,
            name: admin.name,
            email: admin.email,
            role: Role::Admin,
        },
    }))
}

/// Change the admin password. Sits behind the access gate.
///
/// POST /api/admin/passwordchange
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    _claims: Claims,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MsgResponse>, ApiError> {
    let mut admin = db::find_identity_by_email(&state.db, &req.email)
        .await?
        .filter(|identity| identity.role == Role::Admin)
        .ok_or_else(|| ApiError::not_found("Admin not found"))?;

    if req.new_password != req.confirm_password {
        return Err(ApiError::bad_request(
            "New password and confirm password do not match",
        ));
    }
    validate_password(&req.new_password).map_err(ApiError::bad_request)?;

    admin.password_hash = hash_password(&req.new_password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::internal("Server error")
    })?;

    db::save_identity(&state.db, &admin).await?;

    info!(email = %admin.email, "Admin password changed");

    Ok(Json(MsgResponse {
        msg: "Password updated successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::decode_token;
    use crate::api::error::ErrorKind;
    use crate::config::Config;

    async fn test_state() -> Arc<AppState> {
        let mut config = Config::default();
        config.auth.jwt_secret = "test-secret".to_string();
        let db = crate::db::init_memory().await;
        Arc::new(AppState::new(config, db))
    }

    fn bootstrap_request() -> RegisterAdminRequest {
        RegisterAdminRequest {
            name: "Root".to_string(),
            email: "root@clinic.test".to_string(),
            password: "super-secret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_admin_only() {
        let state = test_state().await;

        let Json(response) = register_admin(State(state.clone()), Json(bootstrap_request()))
            .await
            .unwrap();
        let claims = decode_token("test-secret", &response.token).unwrap();
        assert_eq!(claims.role, Role::Admin);

        let err = register_admin(
            State(state.clone()),
            Json(RegisterAdminRequest {
                name: "Second".to_string(),
                email: "second@clinic.test".to_string(),
                password: "super-secret".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.message(), "Admin already exists");
    }

    #[tokio::test]
    async fn test_admin_login() {
        let state = test_state().await;
        register_admin(State(state.clone()), Json(bootstrap_request()))
            .await
            .unwrap();

        let err = login_admin(
            State(state.clone()),
            Json(LoginRequest {
                email: "root@clinic.test".to_string(),
                password: "wrong".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let Json(response) = login_admin(
            State(state.clone()),
            Json(LoginRequest {
                email: "root@clinic.test".to_string(),
                password: "super-secret".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.admin.role, Role::Admin);
        assert_eq!(response.admin.email, "root@clinic.test");
    }

    #[tokio::test]
    async fn test_admin_login_rejects_non_admin_email() {
        let state = test_state().await;
        crate::db::create_identity(
            &state.db,
            "P",
            "p@clinic.test",
            "h",
            Role::Patient,
            None,
            true,
        )
        .await
        .unwrap();

        let err = login_admin(
            State(state.clone()),
            Json(LoginRequest {
                email: "p@clinic.test".to_string(),
                password: "h".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_change_password() {
        let state = test_state().await;
        register_admin(State(state.clone()), Json(bootstrap_request()))
            .await
            .unwrap();

        let claims = Claims {
            sub: "admin".to_string(),
            role: Role::Admin,
            iat: 0,
            exp: i64::MAX,
        };

        let err = change_password(
            State(state.clone()),
            claims.clone(),
            Json(ChangePasswordRequest {
                email: "root@clinic.test".to_string(),
                new_password: "new-secret".to_string(),
                confirm_password: "different".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        change_password(
            State(state.clone()),
            claims,
            Json(ChangePasswordRequest {
                email: "root@clinic.test".to_string(),
                new_password: "new-secret".to_string(),
                confirm_password: "new-secret".to_string(),
            }),
        )
        .await
        .unwrap();

        let Json(response) = login_admin(
            State(state.clone()),
            Json(LoginRequest {
                email: "root@clinic.test".to_string(),
                password: "new-secret".to_string(),
            }),
        )
        .await
        .unwrap();
        assert!(!response.token.is_empty());
    }
}
