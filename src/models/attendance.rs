//! Attendance record model matching the frontend Attendance interface.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Student;

/// Whether the student attended on the recorded date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            _ => None,
        }
    }
}

/// Reference from a record to its student.
///
/// Reads that join the students table yield `Resolved` when the student
/// still exists. Writes, and joins against a deleted student, yield
/// `Unresolved` carrying only the stored identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StudentRef {
    Unresolved { id: String },
    Resolved(Student),
}

impl StudentRef {
    /// The referenced student's identifier, whichever variant holds it.
    pub fn id(&self) -> &str {
        match self {
            StudentRef::Unresolved { id } => id,
            StudentRef::Resolved(student) => &student.id,
        }
    }

    pub fn student(&self) -> Option<&Student> {
        match self {
            StudentRef::Unresolved { .. } => None,
            StudentRef::Resolved(student) => Some(student),
        }
    }
}

/// One attendance entry linking a student to a date and a status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    #[serde(rename = "studentId")]
    pub student: StudentRef,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for marking attendance.
///
/// Fields are taken as raw text and validated by the attendance service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttendanceRequest {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub status: String,
}

/// Request body for updating an attendance record. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAttendanceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Summary counts over a set of attendance records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AttendanceStats {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    /// Present share as a whole percentage, 0 when there are no records
    pub rate: u32,
}

impl AttendanceStats {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a AttendanceRecord>,
    {
        let mut stats = Self::default();
        for record in records {
            stats.total += 1;
            match record.status {
                AttendanceStatus::Present => stats.present += 1,
                AttendanceStatus::Absent => stats.absent += 1,
            }
        }
        stats.rate = attendance_rate(stats.present, stats.total);
        stats
    }
}

/// `round(present / total * 100)`, rounding halves up; 0 for an empty set.
pub fn attendance_rate(present: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let rate = (present as u64 * 200 + total as u64) / (2 * total as u64);
    rate as u32
}
