//! Attendance API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use super::{success, ApiResponse, ApiResult};
use crate::models::{
    AttendanceRecord, AttendanceStats, CreateAttendanceRequest, UpdateAttendanceRequest,
};
use crate::AppState;

/// GET /api/attendance - List all records with students resolved.
pub async fn list_attendance(State(state): State<AppState>) -> ApiResult<Vec<AttendanceRecord>> {
    success(state.attendance.list_attendance().await?)
}

/// GET /api/attendance/stats - Totals and attendance rate over all records.
pub async fn attendance_stats(State(state): State<AppState>) -> ApiResult<AttendanceStats> {
    success(state.attendance.attendance_stats().await?)
}

/// GET /api/attendance/student/:student_id - List records for one student.
pub async fn list_attendance_by_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> ApiResult<Vec<AttendanceRecord>> {
    let records = state
        .attendance
        .list_attendance_by_student(&student_id)
        .await?;
    success(records)
}

/// GET /api/attendance/:id - Get a single record.
pub async fn get_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AttendanceRecord> {
    success(state.attendance.get_attendance(&id).await?)
}

/// POST /api/attendance - Mark attendance.
pub async fn mark_attendance(
    State(state): State<AppState>,
    body: Result<Json<CreateAttendanceRequest>, JsonRejection>,
) -> ApiResult<AttendanceRecord> {
    let Json(request) = body?;
    let record = state.attendance.mark_attendance(&request).await?;
    Ok(ApiResponse::new(record)
        .with_message("Attendance marked")
        .created())
}

/// PUT /api/attendance/:id - Update a record.
pub async fn update_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateAttendanceRequest>, JsonRejection>,
) -> ApiResult<AttendanceRecord> {
    let Json(request) = body?;
    let record = state.attendance.update_attendance(&id, &request).await?;
    Ok(ApiResponse::new(record).with_message("Attendance updated"))
}

/// DELETE /api/attendance/:id - Delete a record. Absent ids also succeed.
pub async fn delete_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.attendance.delete_attendance(&id).await?;
    Ok(ApiResponse::new(()).with_message("Attendance deleted"))
}
