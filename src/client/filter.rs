//! In-memory search, status filtering and ordering over fetched collections.
//!
//! These functions never touch the network; they derive views from the
//! collections already held by the [`ClientCache`](super::ClientCache).

use crate::models::{AttendanceRecord, AttendanceStatus, Student};

/// Status selector of the attendance view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(AttendanceStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: AttendanceStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }

    /// Parse the select-box value: `all`, `present` or `absent`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "all" => Some(StatusFilter::All),
            other => AttendanceStatus::parse(other).map(StatusFilter::Only),
        }
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Students whose name, roll number or department contains `query`,
/// case-insensitively, in fetch order.
///
/// The query is trimmed first: surrounding whitespace never has to match,
/// and a query that is blank after trimming keeps everyone.
pub fn filter_students<'a>(students: &'a [Student], query: &str) -> Vec<&'a Student> {
    let needle = query.trim().to_lowercase();
    students
        .iter()
        .filter(|s| {
            needle.is_empty()
                || contains_ci(&s.name, &needle)
                || contains_ci(&s.roll_number, &needle)
                || contains_ci(&s.department, &needle)
        })
        .collect()
}

/// The student a record points at: the embedded one when resolved,
/// otherwise a lookup in `students` by identifier.
pub fn resolve_student<'a>(
    record: &'a AttendanceRecord,
    students: &'a [Student],
) -> Option<&'a Student> {
    record
        .student
        .student()
        .or_else(|| students.iter().find(|s| s.id == record.student.id()))
}

/// Records matching the search query and status, newest date first.
///
/// The query is trimmed like in [`filter_students`], then matches the
/// resolved student's name or roll number case-insensitively. With a
/// non-blank query, records whose student cannot be resolved are dropped.
/// Records sharing a date keep their relative order.
pub fn filter_attendance<'a>(
    records: &'a [AttendanceRecord],
    students: &'a [Student],
    query: &str,
    status: StatusFilter,
) -> Vec<&'a AttendanceRecord> {
    let needle = query.trim().to_lowercase();
    let mut view: Vec<&AttendanceRecord> = records
        .iter()
        .filter(|record| {
            if needle.is_empty() {
                return true;
            }
            match resolve_student(record, students) {
                Some(student) => {
                    contains_ci(&student.name, &needle)
                        || contains_ci(&student.roll_number, &needle)
                }
                None => false,
            }
        })
        .filter(|record| status.matches(record.status))
        .collect();

    // sort_by is stable
    view.sort_by(|a, b| b.date.cmp(&a.date));
    view
}
