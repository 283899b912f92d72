//! Student use-case service.

use std::sync::Arc;

use chrono::Utc;

use super::required;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{ClassYear, CreateStudentRequest, Student, UpdateStudentRequest};

/// Validates and executes student CRUD against the repository.
#[derive(Clone)]
pub struct StudentService {
    repo: Arc<Repository>,
}

fn parse_year(value: &str) -> Result<ClassYear, AppError> {
    let value = required(value, "Year")?;
    ClassYear::parse(&value).ok_or_else(|| {
        AppError::Validation(format!(
            "Year must be one of {}",
            ClassYear::ALL.map(|y| y.as_str()).join(", ")
        ))
    })
}

impl StudentService {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Create a student after checking required fields and roll-number uniqueness.
    pub async fn create_student(
        &self,
        request: &CreateStudentRequest,
    ) -> Result<Student, AppError> {
        let name = required(&request.name, "Name")?;
        let roll_number = required(&request.roll_number, "Roll number")?;
        let department = required(&request.department, "Department")?;
        let year = parse_year(&request.year)?;

        self.ensure_roll_number_free(&roll_number, None).await?;

        let student = Student {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            roll_number,
            department,
            year,
            created_at: Utc::now(),
        };
        self.repo.insert_student(&student).await?;

        tracing::info!(
            student_id = %student.id,
            roll_number = %student.roll_number,
            "Student created"
        );
        Ok(student)
    }

    pub async fn list_students(&self) -> Result<Vec<Student>, AppError> {
        self.repo.list_students().await
    }

    pub async fn get_student(&self, id: &str) -> Result<Student, AppError> {
        self.repo
            .get_student(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Apply the supplied fields; identity and `created_at` never change.
    pub async fn update_student(
        &self,
        id: &str,
        request: &UpdateStudentRequest,
    ) -> Result<Student, AppError> {
        let mut student = self.get_student(id).await?;

        if let Some(name) = &request.name {
            student.name = required(name, "Name")?;
        }
        if let Some(department) = &request.department {
            student.department = required(department, "Department")?;
        }
        if let Some(year) = &request.year {
            student.year = parse_year(year)?;
        }
        if let Some(roll_number) = &request.roll_number {
            let roll_number = required(roll_number, "Roll number")?;
            if roll_number != student.roll_number {
                self.ensure_roll_number_free(&roll_number, Some(id)).await?;
            }
            student.roll_number = roll_number;
        }

        if !self.repo.update_student(&student).await? {
            return Err(not_found(id));
        }

        tracing::info!(student_id = %id, "Student updated");
        Ok(student)
    }

    /// Remove a student. Deleting an absent id succeeds; records are kept.
    pub async fn delete_student(&self, id: &str) -> Result<(), AppError> {
        if self.repo.delete_student(id).await? {
            tracing::info!(student_id = %id, "Student deleted");
        } else {
            tracing::debug!(student_id = %id, "Delete of absent student ignored");
        }
        Ok(())
    }

    async fn ensure_roll_number_free(
        &self,
        roll_number: &str,
        owner: Option<&str>,
    ) -> Result<(), AppError> {
        if let Some(existing) = self.repo.find_student_by_roll_number(roll_number).await? {
            if Some(existing.id.as_str()) != owner {
                let message = format!("Roll number {} already exists", roll_number);
                return Err(AppError::Conflict(message));
            }
        }
        Ok(())
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Student {} not found", id))
}
