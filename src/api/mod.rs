mod admin;
mod appointments;
pub mod auth;
mod error;
mod users;
mod validation;

pub use error::ApiError;

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // User routes (registration, login, approval workflow)
    let user_routes = Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/approve/:id", patch(users::approve))
        .route("/unapproved", get(users::unapproved))
        .route("/approved-doctors", get(users::approved_doctors))
        .route("/approved-patients", get(users::approved_patients))
        .route("/counts", get(users::counts))
        .route("/register-doctor", post(users::register_doctor))
        .route(
            "/register-approved-patient",
            post(users::register_approved_patient),
        )
        .route("/update-patient/:id", put(users::update_patient))
        .route("/delete/:id", delete(users::delete_user))
        .route("/:id", put(users::update_user).delete(users::delete_user));

    // Admin routes; password change sits behind the access gate
    let admin_protected = Router::new()
        .route("/passwordchange", post(admin::change_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));
    let admin_routes = Router::new()
        .route("/register", post(admin::register_admin))
        .route("/login", post(admin::login_admin))
        .merge(admin_protected);

    // Appointment routes
    let appointment_routes = Router::new()
        .route(
            "/",
            post(appointments::create_appointment).get(appointments::list_appointments),
        )
        .route("/count", get(appointments::count_appointments))
        .route(
            "/:id",
            get(appointments::get_appointment)
                .put(appointments::update_appointment)
                .delete(appointments::delete_appointment),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/user", user_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/appointments", appointment_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
