//! Attendance use-case service.
//!
//! # Invariants
//! - A record always carries a student identifier, a calendar date and a status.
//! - Student existence and per-day uniqueness are only checked when the
//!   [`AttendancePolicy`] asks for them.
//! - Reads never fail because a referenced student is gone; the reference
//!   simply stays unresolved.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use super::{required, AttendancePolicy};
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    AttendanceRecord, AttendanceStats, AttendanceStatus, CreateAttendanceRequest, StudentRef,
    UpdateAttendanceRequest,
};

/// Validates and executes attendance CRUD against the repository.
#[derive(Clone)]
pub struct AttendanceService {
    repo: Arc<Repository>,
    policy: AttendancePolicy,
}

/// Accept `YYYY-MM-DD` or an RFC 3339 timestamp, keeping the UTC calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    let value = required(value, "Date")?;
    if let Ok(date) = NaiveDate::parse_from_str(&value, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(&value)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| AppError::Validation(format!("Date '{}' is not a valid ISO date", value)))
}

fn parse_status(value: &str) -> Result<AttendanceStatus, AppError> {
    let value = required(value, "Status")?;
    AttendanceStatus::parse(&value).ok_or_else(|| {
        AppError::Validation(format!(
            "Status must be 'present' or 'absent', got '{}'",
            value
        ))
    })
}

impl AttendanceService {
    pub fn new(repo: Arc<Repository>, policy: AttendancePolicy) -> Self {
        Self { repo, policy }
    }

    /// Record a student's status for a date.
    pub async fn mark_attendance(
        &self,
        request: &CreateAttendanceRequest,
    ) -> Result<AttendanceRecord, AppError> {
        let student_id = required(&request.student_id, "Student id")?;
        let date = parse_date(&request.date)?;
        let status = parse_status(&request.status)?;

        self.ensure_student_exists(&student_id).await?;

        let now = Utc::now();
        let record = AttendanceRecord {
            id: uuid::Uuid::new_v4().to_string(),
            student: StudentRef::Unresolved { id: student_id },
            date,
            status,
            created_at: now,
            updated_at: now,
        };

        if self.policy.unique_per_day {
            if !self.repo.insert_attendance_if_day_free(&record).await? {
                return Err(day_taken(record.student.id(), date));
            }
        } else {
            self.repo.insert_attendance(&record).await?;
        }

        tracing::info!(
            attendance_id = %record.id,
            student_id = %record.student.id(),
            date = %record.date,
            status = record.status.as_str(),
            "Attendance marked"
        );
        Ok(record)
    }

    pub async fn list_attendance(&self) -> Result<Vec<AttendanceRecord>, AppError> {
        self.repo.list_attendance().await
    }

    /// Records for one student; empty when there are none or the student is unknown.
    pub async fn list_attendance_by_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        self.repo.list_attendance_by_student(student_id).await
    }

    pub async fn get_attendance(&self, id: &str) -> Result<AttendanceRecord, AppError> {
        self.repo
            .get_attendance(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn attendance_stats(&self) -> Result<AttendanceStats, AppError> {
        let records = self.repo.list_attendance().await?;
        Ok(AttendanceStats::from_records(&records))
    }

    /// Apply the supplied fields to an existing record.
    ///
    /// Changing the student identifier moves the record to another student.
    pub async fn update_attendance(
        &self,
        id: &str,
        request: &UpdateAttendanceRequest,
    ) -> Result<AttendanceRecord, AppError> {
        let existing = self.get_attendance(id).await?;

        let student_id = match &request.student_id {
            Some(student_id) => required(student_id, "Student id")?,
            None => existing.student.id().to_string(),
        };
        let date = match &request.date {
            Some(date) => parse_date(date)?,
            None => existing.date,
        };
        let status = match &request.status {
            Some(status) => parse_status(status)?,
            None => existing.status,
        };

        let reassigned = student_id != existing.student.id();
        if reassigned {
            self.ensure_student_exists(&student_id).await?;
        }
        let moved = reassigned || date != existing.date;

        let record = AttendanceRecord {
            id: existing.id,
            student: StudentRef::Unresolved { id: student_id },
            date,
            status,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };

        let updated = if moved && self.policy.unique_per_day {
            self.repo.update_attendance_if_day_free(&record).await?
        } else {
            self.repo.update_attendance(&record).await?
        };
        if !updated {
            if self.repo.get_attendance(id).await?.is_some() {
                return Err(day_taken(record.student.id(), date));
            }
            return Err(not_found(id));
        }

        tracing::info!(attendance_id = %id, "Attendance updated");
        Ok(record)
    }

    /// Remove a record. Deleting an absent id succeeds.
    pub async fn delete_attendance(&self, id: &str) -> Result<(), AppError> {
        if self.repo.delete_attendance(id).await? {
            tracing::info!(attendance_id = %id, "Attendance deleted");
        } else {
            tracing::debug!(attendance_id = %id, "Delete of absent attendance record ignored");
        }
        Ok(())
    }

    async fn ensure_student_exists(&self, student_id: &str) -> Result<(), AppError> {
        if self.policy.require_existing_student
            && self.repo.get_student(student_id).await?.is_none()
        {
            let message = format!("Student {} does not exist", student_id);
            return Err(AppError::Validation(message));
        }
        Ok(())
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Attendance record {} not found", id))
}

fn day_taken(student_id: &str, date: NaiveDate) -> AppError {
    AppError::Conflict(format!(
        "Attendance for student {} on {} already exists",
        student_id, date
    ))
}
