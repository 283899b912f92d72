//! Student API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use super::{success, ApiResponse, ApiResult};
use crate::models::{CreateStudentRequest, Student, UpdateStudentRequest};
use crate::AppState;

/// GET /api/students - List all students.
pub async fn list_students(State(state): State<AppState>) -> ApiResult<Vec<Student>> {
    success(state.students.list_students().await?)
}

/// GET /api/students/:id - Get a single student.
pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Student> {
    success(state.students.get_student(&id).await?)
}

/// POST /api/students - Create a new student.
pub async fn create_student(
    State(state): State<AppState>,
    body: Result<Json<CreateStudentRequest>, JsonRejection>,
) -> ApiResult<Student> {
    let Json(request) = body?;
    let student = state.students.create_student(&request).await?;
    Ok(ApiResponse::new(student)
        .with_message("Student created")
        .created())
}

/// PUT /api/students/:id - Update a student.
pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateStudentRequest>, JsonRejection>,
) -> ApiResult<Student> {
    let Json(request) = body?;
    let student = state.students.update_student(&id, &request).await?;
    Ok(ApiResponse::new(student).with_message("Student updated"))
}

/// DELETE /api/students/:id - Delete a student. Absent ids also succeed.
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    state.students.delete_student(&id).await?;
    Ok(ApiResponse::new(()).with_message("Student deleted"))
}
