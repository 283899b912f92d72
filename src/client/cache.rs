//! Client-side cache of the student and attendance collections.
//!
//! The cache follows one invalidation rule: every successful mutation
//! discards the affected collection and refetches it from the server.
//! Student mutations affect both collections, since attendance records
//! embed their resolved student; attendance mutations affect only the
//! attendance collection.
//!
//! A mutation the server accepted is never reported as failed. When the
//! refetch that follows it fails, the snapshot is flagged stale and the
//! next [`ClientCache::refresh`] brings it back in line.

use chrono::{Duration, NaiveDate, Utc};

use super::filter::{filter_attendance, filter_students, StatusFilter};
use super::{ApiClient, ClientError};
use crate::models::{
    AttendanceRecord, AttendanceStats, AttendanceStatus, ClassYear, CreateAttendanceRequest,
    CreateStudentRequest, Student, StudentRef, UpdateAttendanceRequest, UpdateStudentRequest,
};

/// Where the cached collections came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotSource {
    /// Nothing fetched yet
    #[default]
    Empty,
    Server,
    /// Demo data installed after a failed fetch
    Placeholder,
}

/// The collections currently held in memory.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub students: Vec<Student>,
    pub attendance: Vec<AttendanceRecord>,
    pub source: SnapshotSource,
    /// A write went through but the refetch after it failed
    pub stale: bool,
}

impl Snapshot {
    /// Demo roster shown when the server cannot be reached.
    pub fn placeholder() -> Self {
        let created_at = Utc::now();
        let student = |id: &str, name: &str, roll: &str, department: &str, year| Student {
            id: id.to_string(),
            name: name.to_string(),
            roll_number: roll.to_string(),
            department: department.to_string(),
            year,
            created_at,
        };
        let students = vec![
            student(
                "1",
                "John Doe",
                "CS2024001",
                "Computer Science",
                ClassYear::Second,
            ),
            student(
                "2",
                "Jane Smith",
                "EE2024002",
                "Electrical Engineering",
                ClassYear::Third,
            ),
            student(
                "3",
                "Mike Johnson",
                "ME2024003",
                "Mechanical Engineering",
                ClassYear::First,
            ),
        ];

        let today: NaiveDate = created_at.date_naive();
        let yesterday = today - Duration::days(1);
        let record = |id: &str, student_id: &str, date, status| AttendanceRecord {
            id: id.to_string(),
            student: StudentRef::Unresolved {
                id: student_id.to_string(),
            },
            date,
            status,
            created_at,
            updated_at: created_at,
        };
        let attendance = vec![
            record("1", "1", today, AttendanceStatus::Present),
            record("2", "2", today, AttendanceStatus::Absent),
            record("3", "3", yesterday, AttendanceStatus::Present),
        ];

        Self {
            students,
            attendance,
            source: SnapshotSource::Placeholder,
            stale: false,
        }
    }
}

/// In-memory view of the server's collections with refetch-on-mutation.
pub struct ClientCache {
    api: ApiClient,
    snapshot: Snapshot,
    placeholder_fallback: bool,
}

impl ClientCache {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            snapshot: Snapshot::default(),
            placeholder_fallback: false,
        }
    }

    /// Install [`Snapshot::placeholder`] instead of failing when a full refresh errors.
    pub fn with_placeholder_fallback(mut self, enabled: bool) -> Self {
        self.placeholder_fallback = enabled;
        self
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Refetch both collections in parallel.
    pub async fn refresh(&mut self) -> Result<SnapshotSource, ClientError> {
        match self.fetch_all().await {
            Ok(()) => {}
            Err(err) if self.placeholder_fallback => {
                tracing::warn!("Fetch failed, showing placeholder data: {}", err);
                self.snapshot = Snapshot::placeholder();
            }
            Err(err) => return Err(err),
        }
        Ok(self.snapshot.source)
    }

    async fn fetch_all(&mut self) -> Result<(), ClientError> {
        let (students, attendance) =
            tokio::try_join!(self.api.list_students(), self.api.list_attendance())?;
        self.snapshot = Snapshot {
            students,
            attendance,
            source: SnapshotSource::Server,
            stale: false,
        };
        Ok(())
    }

    async fn refresh_attendance(&mut self) -> Result<(), ClientError> {
        self.snapshot.attendance = self.api.list_attendance().await?;
        Ok(())
    }

    /// Refetch what a successful write touched. Failures only mark the
    /// snapshot stale; the write itself already happened.
    async fn invalidate(&mut self, students_changed: bool) {
        let refetched = if students_changed {
            self.fetch_all().await
        } else {
            self.refresh_attendance().await
        };
        if let Err(err) = refetched {
            tracing::warn!("Refetch after write failed, snapshot is stale: {}", err);
            self.snapshot.stale = true;
        }
    }

    // ── Derived views ─────────────────────────────────────────────────────────

    pub fn student_view(&self, query: &str) -> Vec<&Student> {
        filter_students(&self.snapshot.students, query)
    }

    pub fn attendance_view(&self, query: &str, status: StatusFilter) -> Vec<&AttendanceRecord> {
        filter_attendance(
            &self.snapshot.attendance,
            &self.snapshot.students,
            query,
            status,
        )
    }

    /// Totals over every cached record, independent of any view filter.
    pub fn stats(&self) -> AttendanceStats {
        AttendanceStats::from_records(&self.snapshot.attendance)
    }

    // ── Mutations ─────────────────────────────────────────────────────────────

    pub async fn create_student(
        &mut self,
        request: &CreateStudentRequest,
    ) -> Result<Student, ClientError> {
        let student = self.api.create_student(request).await?;
        self.invalidate(true).await;
        Ok(student)
    }

    pub async fn update_student(
        &mut self,
        id: &str,
        request: &UpdateStudentRequest,
    ) -> Result<Student, ClientError> {
        let student = self.api.update_student(id, request).await?;
        self.invalidate(true).await;
        Ok(student)
    }

    pub async fn delete_student(&mut self, id: &str) -> Result<(), ClientError> {
        self.api.delete_student(id).await?;
        self.invalidate(true).await;
        Ok(())
    }

    pub async fn mark_attendance(
        &mut self,
        request: &CreateAttendanceRequest,
    ) -> Result<AttendanceRecord, ClientError> {
        let record = self.api.mark_attendance(request).await?;
        self.invalidate(false).await;
        Ok(record)
    }

    pub async fn update_attendance(
        &mut self,
        id: &str,
        request: &UpdateAttendanceRequest,
    ) -> Result<AttendanceRecord, ClientError> {
        let record = self.api.update_attendance(id, request).await?;
        self.invalidate(false).await;
        Ok(record)
    }

    pub async fn delete_attendance(&mut self, id: &str) -> Result<(), ClientError> {
        self.api.delete_attendance(id).await?;
        self.invalidate(false).await;
        Ok(())
    }
}
