//! Database repository for CRUD operations.
//!
//! The repository only moves rows in and out of SQLite. Validation and
//! uniqueness rules live in the service layer.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{AttendanceRecord, AttendanceStatus, ClassYear, Student, StudentRef};

const STUDENT_COLUMNS: &str = "id, name, roll_number, department, year, created_at";

const ATTENDANCE_JOINED_SELECT: &str = r#"
    SELECT a.id, a.student_id, a.date, a.status, a.created_at, a.updated_at,
           s.id AS s_id, s.name AS s_name, s.roll_number AS s_roll_number,
           s.department AS s_department, s.year AS s_year, s.created_at AS s_created_at
    FROM attendance a
    LEFT JOIN students s ON s.id = a.student_id"#;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== STUDENT OPERATIONS ====================

    /// List all students in insertion order.
    pub async fn list_students(&self) -> Result<Vec<Student>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students ORDER BY rowid"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(student_from_row).collect()
    }

    /// Get a student by ID.
    pub async fn get_student(&self, id: &str) -> Result<Option<Student>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(student_from_row).transpose()
    }

    /// Get a student by roll number.
    pub async fn find_student_by_roll_number(
        &self,
        roll_number: &str,
    ) -> Result<Option<Student>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE roll_number = ?"
        ))
        .bind(roll_number)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(student_from_row).transpose()
    }

    /// Insert a fully-formed student.
    pub async fn insert_student(&self, student: &Student) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO students (id, name, roll_number, department, year, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&student.id)
        .bind(&student.name)
        .bind(&student.roll_number)
        .bind(&student.department)
        .bind(student.year.as_str())
        .bind(student.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Overwrite the mutable columns of a student. Returns false if no row matched.
    pub async fn update_student(&self, student: &Student) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE students SET name = ?, roll_number = ?, department = ?, year = ? WHERE id = ?",
        )
        .bind(&student.name)
        .bind(&student.roll_number)
        .bind(&student.department)
        .bind(student.year.as_str())
        .bind(&student.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a student. Returns whether a row was removed.
    pub async fn delete_student(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== ATTENDANCE OPERATIONS ====================

    /// List all records with their student resolved where it still exists.
    pub async fn list_attendance(&self) -> Result<Vec<AttendanceRecord>, AppError> {
        let rows = sqlx::query(&format!("{ATTENDANCE_JOINED_SELECT} ORDER BY a.rowid"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(attendance_from_joined_row).collect()
    }

    /// List the records referencing one student identifier.
    pub async fn list_attendance_by_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let rows = sqlx::query(&format!(
            "{ATTENDANCE_JOINED_SELECT} WHERE a.student_id = ? ORDER BY a.rowid"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(attendance_from_joined_row).collect()
    }

    /// Get a record by ID with its student resolved.
    pub async fn get_attendance(&self, id: &str) -> Result<Option<AttendanceRecord>, AppError> {
        let row = sqlx::query(&format!("{ATTENDANCE_JOINED_SELECT} WHERE a.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(attendance_from_joined_row).transpose()
    }

    /// Insert a fully-formed record. Only the student identifier is stored.
    pub async fn insert_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO attendance (id, student_id, date, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(record.student.id())
        .bind(record.date)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Overwrite the mutable columns of a record. Returns false if no row matched.
    pub async fn update_attendance(&self, record: &AttendanceRecord) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE attendance SET student_id = ?, date = ?, status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(record.student.id())
        .bind(record.date)
        .bind(record.status.as_str())
        .bind(record.updated_at)
        .bind(&record.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a record unless its student already has one on the same date.
    ///
    /// The check and the insert run as one statement, so concurrent writers
    /// cannot both claim the day. Returns false when the day was taken.
    pub async fn insert_attendance_if_day_free(
        &self,
        record: &AttendanceRecord,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance (id, student_id, date, status, created_at, updated_at)
            SELECT ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM attendance WHERE student_id = ? AND date = ?
            )
            "#,
        )
        .bind(&record.id)
        .bind(record.student.id())
        .bind(record.date)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.student.id())
        .bind(record.date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Update a record unless another record holds its student and date.
    ///
    /// Returns false when no row changed: either the id is unknown or the
    /// day is taken.
    pub async fn update_attendance_if_day_free(
        &self,
        record: &AttendanceRecord,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance SET student_id = ?, date = ?, status = ?, updated_at = ?
            WHERE id = ? AND NOT EXISTS (
                SELECT 1 FROM attendance WHERE student_id = ? AND date = ? AND id != ?
            )
            "#,
        )
        .bind(record.student.id())
        .bind(record.date)
        .bind(record.status.as_str())
        .bind(record.updated_at)
        .bind(&record.id)
        .bind(record.student.id())
        .bind(record.date)
        .bind(&record.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a record. Returns whether a row was removed.
    pub async fn delete_attendance(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM attendance WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// Helper functions for row conversion

fn parse_year(raw: &str) -> Result<ClassYear, AppError> {
    ClassYear::parse(raw)
        .ok_or_else(|| AppError::Internal(format!("Stored year '{}' is invalid", raw)))
}

fn student_from_row(row: &SqliteRow) -> Result<Student, AppError> {
    let year: String = row.try_get("year")?;
    Ok(Student {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        roll_number: row.try_get("roll_number")?,
        department: row.try_get("department")?,
        year: parse_year(&year)?,
        created_at: row.try_get("created_at")?,
    })
}

fn attendance_from_joined_row(row: &SqliteRow) -> Result<AttendanceRecord, AppError> {
    let status: String = row.try_get("status")?;
    let status = AttendanceStatus::parse(&status)
        .ok_or_else(|| AppError::Internal(format!("Stored status '{}' is invalid", status)))?;

    let joined_id: Option<String> = row.try_get("s_id")?;
    let student = match joined_id {
        Some(id) => {
            let year: String = row.try_get("s_year")?;
            StudentRef::Resolved(Student {
                id,
                name: row.try_get("s_name")?,
                roll_number: row.try_get("s_roll_number")?,
                department: row.try_get("s_department")?,
                year: parse_year(&year)?,
                created_at: row.try_get("s_created_at")?,
            })
        }
        None => StudentRef::Unresolved {
            id: row.try_get("student_id")?,
        },
    };

    Ok(AttendanceRecord {
        id: row.try_get("id")?,
        student,
        date: row.try_get("date")?,
        status,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
