//! Student model matching the frontend Student interface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Class-year labels offered by the student form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ClassYear {
    #[serde(rename = "1st Year")]
    First,
    #[serde(rename = "2nd Year")]
    Second,
    #[serde(rename = "3rd Year")]
    Third,
    #[serde(rename = "4th Year")]
    Fourth,
}

impl ClassYear {
    pub const ALL: [ClassYear; 4] = [
        ClassYear::First,
        ClassYear::Second,
        ClassYear::Third,
        ClassYear::Fourth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassYear::First => "1st Year",
            ClassYear::Second => "2nd Year",
            ClassYear::Third => "3rd Year",
            ClassYear::Fourth => "4th Year",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|y| y.as_str() == s.trim())
    }
}

impl std::fmt::Display for ClassYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An enrolled student.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    /// Human-readable identifier, unique across all students
    pub roll_number: String,
    pub department: String,
    pub year: ClassYear,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating a new student.
///
/// Every field defaults to empty so that a missing field surfaces as a
/// validation error rather than a body-parsing failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roll_number: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub year: String,
}

/// Request body for updating an existing student. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}
