//! Data models for the attendance application.
//!
//! Field names serialize in camelCase to match the frontend Student/Attendance interfaces.

mod attendance;
mod student;

pub use attendance::*;
pub use student::*;
