//! Async HTTP client wrapping the attendance JSON API.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::ClientError;
use crate::errors::ErrorResponse;
use crate::models::{
    AttendanceRecord, AttendanceStats, CreateAttendanceRequest, CreateStudentRequest, Student,
    UpdateAttendanceRequest, UpdateStudentRequest,
};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Async HTTP client for the attendance REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// `base_url` is the server origin, e.g. `http://localhost:5000`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, base_url })
    }

    /// `{base}/api/{segments...}` with every segment percent-encoded, so
    /// identifiers containing `/`, `?` or `#` stay inside their segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    /// Send a request and unwrap the success envelope, or turn the error
    /// envelope into [`ClientError::Api`].
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let resp = request.send().await?;
        let status = resp.status();

        if status.is_success() {
            let envelope: Envelope<T> = resp.json().await?;
            return Ok(envelope.data);
        }

        let (code, message) = match resp.json::<ErrorResponse>().await {
            Ok(body) => (body.error.code, body.error.message),
            Err(_) => {
                let reason = status.canonical_reason().unwrap_or("Request failed");
                ("UNKNOWN".to_string(), reason.to_string())
            }
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    // ── Students ──────────────────────────────────────────────────────────────

    /// `GET /api/students`
    pub async fn list_students(&self) -> Result<Vec<Student>, ClientError> {
        let url = self.url(&["students"]);
        self.send(self.client.get(url)).await
    }

    /// `GET /api/students/:id`
    pub async fn get_student(&self, id: &str) -> Result<Student, ClientError> {
        let url = self.url(&["students", id]);
        self.send(self.client.get(url)).await
    }

    /// `POST /api/students`
    pub async fn create_student(
        &self,
        request: &CreateStudentRequest,
    ) -> Result<Student, ClientError> {
        let url = self.url(&["students"]);
        self.send(self.client.post(url).json(request)).await
    }

    /// `PUT /api/students/:id`
    pub async fn update_student(
        &self,
        id: &str,
        request: &UpdateStudentRequest,
    ) -> Result<Student, ClientError> {
        let url = self.url(&["students", id]);
        self.send(self.client.put(url).json(request)).await
    }

    /// `DELETE /api/students/:id`
    pub async fn delete_student(&self, id: &str) -> Result<(), ClientError> {
        let url = self.url(&["students", id]);
        self.send(self.client.delete(url)).await
    }

    // ── Attendance ────────────────────────────────────────────────────────────

    /// `GET /api/attendance`
    pub async fn list_attendance(&self) -> Result<Vec<AttendanceRecord>, ClientError> {
        let url = self.url(&["attendance"]);
        self.send(self.client.get(url)).await
    }

    /// `GET /api/attendance/stats`
    pub async fn attendance_stats(&self) -> Result<AttendanceStats, ClientError> {
        let url = self.url(&["attendance", "stats"]);
        self.send(self.client.get(url)).await
    }

    /// `GET /api/attendance/student/:student_id`
    pub async fn list_attendance_by_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttendanceRecord>, ClientError> {
        let url = self.url(&["attendance", "student", student_id]);
        self.send(self.client.get(url)).await
    }

    /// `GET /api/attendance/:id`
    pub async fn get_attendance(&self, id: &str) -> Result<AttendanceRecord, ClientError> {
        let url = self.url(&["attendance", id]);
        self.send(self.client.get(url)).await
    }

    /// `POST /api/attendance`
    pub async fn mark_attendance(
        &self,
        request: &CreateAttendanceRequest,
    ) -> Result<AttendanceRecord, ClientError> {
        let url = self.url(&["attendance"]);
        self.send(self.client.post(url).json(request)).await
    }

    /// `PUT /api/attendance/:id`
    pub async fn update_attendance(
        &self,
        id: &str,
        request: &UpdateAttendanceRequest,
    ) -> Result<AttendanceRecord, ClientError> {
        let url = self.url(&["attendance", id]);
        self.send(self.client.put(url).json(request)).await
    }

    /// `DELETE /api/attendance/:id`
    pub async fn delete_attendance(&self, id: &str) -> Result<(), ClientError> {
        let url = self.url(&["attendance", id]);
        self.send(self.client.delete(url)).await
    }
}
