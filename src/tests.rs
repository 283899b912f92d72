//! Integration tests for the attendance backend.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::client::{ApiClient, ClientCache, ClientError, SnapshotSource, StatusFilter};
use crate::db::{init_database, Repository};
use crate::models::{
    AttendanceStatus, ClassYear, CreateAttendanceRequest, CreateStudentRequest, Student,
    StudentRef, UpdateStudentRequest,
};
use crate::service::AttendancePolicy;
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_policy(AttendancePolicy::default()).await
    }

    async fn with_policy(policy: AttendancePolicy) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        let app = create_router(AppState::new(repo, policy));

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn create_student(&self, name: &str, roll: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/api/students"))
            .json(&json!({
                "name": name,
                "rollNumber": roll,
                "department": "CS",
                "year": "1st Year"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    async fn mark(&self, student_id: &str, date: &str, status: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/attendance"))
            .json(&json!({ "studentId": student_id, "date": date, "status": status }))
            .send()
            .await
            .unwrap()
    }

    async fn put(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get_json(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_student_crud() {
    let fixture = TestFixture::new().await;

    // Create student
    let create_resp = fixture
        .client
        .post(fixture.url("/api/students"))
        .json(&json!({
            "name": "John Doe",
            "rollNumber": "CS2024001",
            "department": "Computer Science",
            "year": "2nd Year"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(create_resp.status(), 201);
    let create_body: Value = create_resp.json().await.unwrap();
    assert_eq!(create_body["success"], true);
    assert_eq!(create_body["message"], "Student created");
    let student_id = create_body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(create_body["data"]["rollNumber"], "CS2024001");
    assert!(create_body["data"]["createdAt"].is_string());

    // Get student
    let (status, get_body) = fixture
        .get_json(&format!("/api/students/{}", student_id))
        .await;
    assert_eq!(status, 200);
    assert_eq!(get_body["data"]["name"], "John Doe");
    assert_eq!(get_body["data"]["year"], "2nd Year");

    // Update student
    let update_resp = fixture
        .client
        .put(fixture.url(&format!("/api/students/{}", student_id)))
        .json(&json!({ "year": "3rd Year" }))
        .send()
        .await
        .unwrap();

    assert_eq!(update_resp.status(), 200);
    let update_body: Value = update_resp.json().await.unwrap();
    assert_eq!(update_body["message"], "Student updated");
    assert_eq!(update_body["data"]["year"], "3rd Year");
    assert_eq!(update_body["data"]["name"], "John Doe");
    assert_eq!(
        update_body["data"]["createdAt"],
        create_body["data"]["createdAt"]
    );

    // List students
    let (status, list_body) = fixture.get_json("/api/students").await;
    assert_eq!(status, 200);
    assert_eq!(list_body["data"].as_array().unwrap().len(), 1);

    // Delete student
    let delete_resp = fixture
        .client
        .delete(fixture.url(&format!("/api/students/{}", student_id)))
        .send()
        .await
        .unwrap();

    assert_eq!(delete_resp.status(), 200);
    let delete_body: Value = delete_resp.json().await.unwrap();
    assert_eq!(delete_body["message"], "Student deleted");

    // Verify deleted
    let (status, _) = fixture
        .get_json(&format!("/api/students/{}", student_id))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_validation_errors() {
    let fixture = TestFixture::new().await;

    // Missing rollNumber
    let resp = fixture
        .client
        .post(fixture.url("/api/students"))
        .json(&json!({ "name": "Ann", "department": "CS", "year": "1st Year" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // Year outside the enumerated labels
    let resp = fixture
        .client
        .post(fixture.url("/api/students"))
        .json(&json!({ "name": "Ann", "rollNumber": "R1", "department": "CS", "year": "2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Invalid attendance status
    let resp = fixture.mark("someone", "2024-01-01", "late").await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // Missing date
    let resp = fixture
        .client
        .post(fixture.url("/api/attendance"))
        .json(&json!({ "studentId": "someone", "status": "present" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/students"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_duplicate_roll_number_conflict() {
    let fixture = TestFixture::new().await;

    let first = fixture.create_student("Ann", "R1").await;

    let resp = fixture
        .client
        .post(fixture.url("/api/students"))
        .json(&json!({
            "name": "Bob",
            "rollNumber": "R1",
            "department": "EE",
            "year": "2nd Year"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "CONFLICT");

    // First student is unaffected
    let (_, list_body) = fixture.get_json("/api/students").await;
    let students = list_body["data"].as_array().unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0]["id"], first["id"]);
    assert_eq!(students[0]["name"], "Ann");

    // Updating another student onto R1 also conflicts
    let bob = fixture.create_student("Bob", "R2").await;
    let bob_path = format!("/api/students/{}", bob["id"].as_str().unwrap());
    let resp = fixture.put(&bob_path, json!({ "rollNumber": "R1" })).await;
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn test_not_found_errors() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/api/students/non-existent-id").await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let resp = fixture
        .client
        .put(fixture.url("/api/students/non-existent-id"))
        .json(&json!({ "name": "Nobody" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .client
        .put(fixture.url("/api/attendance/non-existent-id"))
        .json(&json!({ "status": "absent" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let (status, _) = fixture.get_json("/api/attendance/non-existent-id").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_delete_missing_ids_succeeds() {
    let fixture = TestFixture::new().await;

    for path in ["/api/students/missing", "/api/attendance/missing"] {
        let resp = fixture
            .client
            .delete(fixture.url(path))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
    }
}

#[tokio::test]
async fn test_attendance_crud_and_resolution() {
    let fixture = TestFixture::new().await;
    let ann = fixture.create_student("Ann", "R1").await;
    let ann_id = ann["id"].as_str().unwrap();

    let resp = fixture.mark(ann_id, "2024-01-01", "present").await;
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Attendance marked");
    assert_eq!(body["data"]["date"], "2024-01-01");
    assert_eq!(body["data"]["status"], "present");
    assert_eq!(body["data"]["studentId"]["kind"], "unresolved");
    assert_eq!(body["data"]["studentId"]["id"], ann_id);
    let record_id = body["data"]["id"].as_str().unwrap().to_string();

    // Listing resolves the student
    let (status, list_body) = fixture.get_json("/api/attendance").await;
    assert_eq!(status, 200);
    let records = list_body["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["studentId"]["kind"], "resolved");
    assert_eq!(records[0]["studentId"]["name"], "Ann");
    assert_eq!(records[0]["studentId"]["rollNumber"], "R1");

    // Timestamps from the client are reduced to their date
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/attendance/{}", record_id)))
        .json(&json!({ "status": "absent", "date": "2024-01-03T09:15:00.000Z" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Attendance updated");
    assert_eq!(body["data"]["status"], "absent");
    assert_eq!(body["data"]["date"], "2024-01-03");

    let (status, body) = fixture
        .get_json(&format!("/api/attendance/{}", record_id))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "absent");

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/attendance/{}", record_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Attendance deleted");

    let (_, list_body) = fixture.get_json("/api/attendance").await;
    assert!(list_body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_attendance_by_student() {
    let fixture = TestFixture::new().await;
    let ann = fixture.create_student("Ann", "R1").await;
    let bob = fixture.create_student("Bob", "R2").await;
    let carl = fixture.create_student("Carl", "R3").await;
    let (ann_id, bob_id) = (ann["id"].as_str().unwrap(), bob["id"].as_str().unwrap());

    fixture.mark(ann_id, "2024-01-01", "present").await;
    fixture.mark(bob_id, "2024-01-01", "absent").await;
    fixture.mark(ann_id, "2024-01-02", "absent").await;

    let (status, body) = fixture
        .get_json(&format!("/api/attendance/student/{}", ann_id))
        .await;
    assert_eq!(status, 200);
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r["studentId"]["id"] == ann_id));

    let carl_path = format!("/api/attendance/student/{}", carl["id"].as_str().unwrap());
    let (_, body) = fixture.get_json(&carl_path).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = fixture.get_json("/api/attendance/student/nobody").await;
    assert_eq!(status, 200);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_attendance_stats_endpoint() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture.get_json("/api/attendance/stats").await;
    assert_eq!(
        body["data"],
        json!({ "total": 0, "present": 0, "absent": 0, "rate": 0 })
    );

    for status in ["present", "absent", "present", "present"] {
        fixture.mark("s1", "2024-01-01", status).await;
    }

    let (status, body) = fixture.get_json("/api/attendance/stats").await;
    assert_eq!(status, 200);
    assert_eq!(
        body["data"],
        json!({ "total": 4, "present": 3, "absent": 1, "rate": 75 })
    );
}

#[tokio::test]
async fn test_delete_student_does_not_cascade() {
    let fixture = TestFixture::new().await;

    let ann = fixture.create_student("Ann", "R1").await;
    let ann_id = ann["id"].as_str().unwrap();
    let resp = fixture.mark(ann_id, "2024-01-01", "present").await;
    assert_eq!(resp.status(), 201);

    let (_, body) = fixture
        .get_json(&format!("/api/attendance/student/{}", ann_id))
        .await;
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "present");

    fixture
        .client
        .delete(fixture.url(&format!("/api/students/{}", ann_id)))
        .send()
        .await
        .unwrap();

    let (_, body) = fixture
        .get_json(&format!("/api/attendance/student/{}", ann_id))
        .await;
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "present");
    assert_eq!(
        records[0]["studentId"],
        json!({ "kind": "unresolved", "id": ann_id })
    );

    // The full list still succeeds with the dangling reference
    let (status, body) = fixture.get_json("/api/attendance").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_strict_attendance_policy() {
    let fixture = TestFixture::with_policy(AttendancePolicy {
        require_existing_student: true,
        unique_per_day: true,
    })
    .await;

    let resp = fixture.mark("ghost", "2024-01-01", "present").await;
    assert_eq!(resp.status(), 400);

    let ann = fixture.create_student("Ann", "R1").await;
    let ann_id = ann["id"].as_str().unwrap();
    let resp = fixture.mark(ann_id, "2024-01-01", "present").await;
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    let record_path = format!("/api/attendance/{}", body["data"]["id"].as_str().unwrap());

    let resp = fixture.mark(ann_id, "2024-01-01", "absent").await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "CONFLICT");

    // Moving the record onto an unknown student is rejected and changes nothing
    let resp = fixture.put(&record_path, json!({ "studentId": "ghost" })).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (_, body) = fixture.get_json(&record_path).await;
    assert_eq!(body["data"]["studentId"]["id"], ann_id);
    assert_eq!(body["data"]["studentId"]["kind"], "resolved");
}

#[tokio::test]
async fn test_update_moves_record_to_another_student() {
    let fixture = TestFixture::new().await;
    let ann = fixture.create_student("Ann", "R1").await;
    let bob = fixture.create_student("Bob", "R2").await;
    let (ann_id, bob_id) = (ann["id"].as_str().unwrap(), bob["id"].as_str().unwrap());

    let resp = fixture.mark(ann_id, "2024-01-01", "present").await;
    let body: Value = resp.json().await.unwrap();
    let record_path = format!("/api/attendance/{}", body["data"]["id"].as_str().unwrap());

    let resp = fixture.put(&record_path, json!({ "studentId": bob_id })).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["studentId"]["id"], bob_id);
    assert_eq!(body["data"]["status"], "present");

    let (_, body) = fixture
        .get_json(&format!("/api/attendance/student/{}", ann_id))
        .await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (_, body) = fixture
        .get_json(&format!("/api/attendance/student/{}", bob_id))
        .await;
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["studentId"]["name"], "Bob");
}

#[tokio::test]
async fn test_client_cache_end_to_end() {
    let fixture = TestFixture::new().await;
    let api = ApiClient::new(&fixture.base_url).unwrap();
    let mut cache = ClientCache::new(api);

    assert_eq!(cache.refresh().await.unwrap(), SnapshotSource::Server);
    assert!(cache.snapshot().students.is_empty());

    let ann = cache
        .create_student(&CreateStudentRequest {
            name: "Ann".into(),
            roll_number: "R1".into(),
            department: "CS".into(),
            year: "1st Year".into(),
        })
        .await
        .unwrap();
    assert_eq!(cache.snapshot().students.len(), 1);
    assert!(!cache.snapshot().stale);

    let record = cache
        .mark_attendance(&CreateAttendanceRequest {
            student_id: ann.id.clone(),
            date: "2024-01-01".into(),
            status: "present".into(),
        })
        .await
        .unwrap();
    assert_eq!(
        record.student,
        StudentRef::Unresolved { id: ann.id.clone() }
    );

    // Mutation refetched the attendance collection with the student resolved
    let view = cache.attendance_view("ann", StatusFilter::All);
    assert_eq!(view.len(), 1);
    assert_eq!(
        view[0].student.student().map(|s| s.name.as_str()),
        Some("Ann")
    );
    assert_eq!(cache.stats().rate, 100);

    let by_student = cache
        .api()
        .list_attendance_by_student(&ann.id)
        .await
        .unwrap();
    assert_eq!(by_student.len(), 1);
    assert_eq!(by_student[0].status, AttendanceStatus::Present);

    cache
        .update_student(
            &ann.id,
            &UpdateStudentRequest {
                name: Some("Annie".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cache.student_view("annie").len(), 1);
    assert_eq!(cache.attendance_view("annie", StatusFilter::All).len(), 1);

    // Errors come back as typed API errors
    let err = cache
        .create_student(&CreateStudentRequest {
            name: "Dup".into(),
            roll_number: "R1".into(),
            department: "CS".into(),
            year: "1st Year".into(),
        })
        .await
        .unwrap_err();
    match &err {
        ClientError::Api { status, code, .. } => {
            assert_eq!(*status, 409);
            assert_eq!(code, "CONFLICT");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.status(), Some(409));

    cache.delete_student(&ann.id).await.unwrap();
    assert!(cache.snapshot().students.is_empty());
    assert_eq!(cache.snapshot().attendance.len(), 1);
    assert!(cache.attendance_view("ann", StatusFilter::All).is_empty());

    cache.delete_attendance(&record.id).await.unwrap();
    assert!(cache.snapshot().attendance.is_empty());
    assert_eq!(cache.stats().rate, 0);
    assert!(!cache.snapshot().stale);
}

#[tokio::test]
async fn test_client_keeps_reserved_characters_inside_identifiers() {
    let fixture = TestFixture::new().await;
    let api = ApiClient::new(&fixture.base_url).unwrap();

    fixture.mark("a", "2024-01-01", "present").await;
    fixture.mark("a#b", "2024-01-02", "absent").await;
    fixture.mark("a/b", "2024-01-03", "present").await;

    let records = api.list_attendance_by_student("a#b").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].student.id(), "a#b");
    assert_eq!(records[0].status, AttendanceStatus::Absent);

    let records = api.list_attendance_by_student("a/b").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].date.to_string(), "2024-01-03");

    let err = api.get_student("a?b").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_init_database_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let db_path: PathBuf = temp_dir.path().join("nested").join("test.sqlite");

    let pool = init_database(&db_path).await.unwrap();
    Repository::new(pool.clone())
        .insert_student(&sample_student())
        .await
        .unwrap();
    pool.close().await;

    // Reopening runs the migrations again against existing tables
    let pool = init_database(&db_path).await.unwrap();
    let students = Repository::new(pool).list_students().await.unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].roll_number, "R1");
}

#[tokio::test]
async fn test_router_oneshot() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.sqlite");
    let repo = Arc::new(Repository::new(init_database(&db_path).await.unwrap()));
    let app = create_router(AppState::new(repo, AttendancePolicy::default()));

    let resp = app
        .clone()
        .oneshot(Request::get("/api/students").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(Request::get("/api/unknown").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

fn sample_student() -> Student {
    Student {
        id: "s-1".to_string(),
        name: "Ann".to_string(),
        roll_number: "R1".to_string(),
        department: "CS".to_string(),
        year: ClassYear::First,
        created_at: chrono::Utc::now(),
    }
}
