//! Student Attendance Backend
//!
//! A REST backend over students and attendance records with SQLite persistence,
//! plus the client-side data layer used by the single-page frontend.

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod service;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use db::Repository;
use service::{AttendancePolicy, AttendanceService, StudentService};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub students: StudentService,
    pub attendance: AttendanceService,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, policy: AttendancePolicy) -> Self {
        Self {
            students: StudentService::new(repo.clone()),
            attendance: AttendanceService::new(repo, policy),
        }
    }
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Students
        .route(
            "/students",
            get(api::list_students).post(api::create_student),
        )
        .route(
            "/students/{id}",
            get(api::get_student)
                .put(api::update_student)
                .delete(api::delete_student),
        )
        // Attendance
        .route(
            "/attendance",
            get(api::list_attendance).post(api::mark_attendance),
        )
        .route("/attendance/stats", get(api::attendance_stats))
        .route(
            "/attendance/student/{student_id}",
            get(api::list_attendance_by_student),
        )
        .route(
            "/attendance/{id}",
            get(api::get_attendance)
                .put(api::update_attendance)
                .delete(api::delete_attendance),
        );

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
