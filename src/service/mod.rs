//! Domain services.
//!
//! Services validate input, enforce the student/attendance invariants and
//! delegate persistence to the [`Repository`](crate::db::Repository). They
//! hold no state between calls beyond the shared repository handle.

mod attendance_service;
mod student_service;

pub use attendance_service::*;
pub use student_service::*;

use crate::errors::AppError;

/// Rules applied to attendance writes.
///
/// Both default to off: records may reference unknown students and a
/// student may hold several records on the same date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendancePolicy {
    /// Reject writes whose student identifier does not match a stored student
    pub require_existing_student: bool,
    /// Reject a second record for the same student on the same date
    pub unique_per_day: bool,
}

/// Trim a required text field, failing validation when it is blank.
fn required(value: &str, label: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", label)));
    }
    Ok(trimmed.to_string())
}
