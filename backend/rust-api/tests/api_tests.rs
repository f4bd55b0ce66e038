//! End-to-end API tests driven through the router with `oneshot`.
//!
//! These hit a real MongoDB instance configured via `.env.test`; run them
//! with `cargo test -- --ignored` when one is available.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

mod common;

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

/// Register a fresh user and return (token, profile json)
async fn register_user(app: &Router, role: &str) -> (String, Value) {
    let email = format!("{}-{}@example.com", role, Uuid::new_v4());
    let (status, body) = send_json(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": format!("Test {}", role),
            "email": email,
            "password": "password123",
            "role": role,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    let token = body["token"].as_str().expect("token in response").to_string();
    (token, body)
}

async fn create_course(app: &Router, token: &str) -> String {
    let (status, body) = send_json(
        app,
        "POST",
        "/api/courses",
        Some(token),
        Some(json!({
            "title": "Algebra Basics",
            "description": "Linear equations from scratch",
            "category": "Math",
            "price": 499.0,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "create course failed: {}", body);
    body["id"].as_str().expect("course id").to_string()
}

#[tokio::test]
#[ignore = "requires a running MongoDB (cargo test -- --ignored)"]
async fn register_login_me_flow() {
    let app = common::create_test_app().await;

    let email = format!("auth-{}@example.com", Uuid::new_v4());
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Flow",
            "email": email,
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "student");
    assert_eq!(body["email"], email.as_str());

    // Duplicate email is a conflict
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Flow",
            "email": email,
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Wrong password does not log in
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();

    let (status, body) = send_json(&app, "GET", "/api/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], email.as_str());

    // No token, no profile
    let (status, _) = send_json(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires a running MongoDB (cargo test -- --ignored)"]
async fn admin_role_cannot_be_self_assigned() {
    let app = common::create_test_app().await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Sneaky",
            "email": format!("admin-{}@example.com", Uuid::new_v4()),
            "password": "password123",
            "role": "admin",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires a running MongoDB (cargo test -- --ignored)"]
async fn course_ownership_is_enforced() {
    let app = common::create_test_app().await;

    let (owner_token, _) = register_user(&app, "instructor").await;
    let (other_token, _) = register_user(&app, "instructor").await;
    let (student_token, _) = register_user(&app, "student").await;

    // Students cannot create courses
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/courses",
        Some(&student_token),
        Some(json!({
            "title": "Nope",
            "description": "Nope",
            "category": "Nope",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let course_id = create_course(&app, &owner_token).await;

    // Owned course shows up in my-created-courses
    let (status, body) = send_json(
        &app,
        "GET",
        "/api/courses/my-created-courses",
        Some(&owner_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .any(|course| course["id"] == course_id.as_str()));

    // A different instructor may neither update nor delete it
    let patch = json!({ "title": "Hijacked" });
    let uri = format!("/api/courses/{}", course_id);
    let (status, _) = send_json(&app, "PUT", &uri, Some(&other_token), Some(patch.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send_json(&app, "DELETE", &uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owner may update it
    let (status, body) = send_json(&app, "PUT", &uri, Some(&owner_token), Some(patch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Hijacked");

    // Deleting removes it everywhere
    let (status, _) = send_json(&app, "DELETE", &uri, Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send_json(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send_json(
        &app,
        "GET",
        "/api/courses/my-created-courses",
        Some(&owner_token),
        None,
    )
    .await;
    assert!(!body
        .as_array()
        .unwrap()
        .iter()
        .any(|course| course["id"] == course_id.as_str()));
}

#[tokio::test]
#[ignore = "requires a running MongoDB (cargo test -- --ignored)"]
async fn double_enrollment_conflicts() {
    let app = common::create_test_app().await;

    let (instructor_token, _) = register_user(&app, "instructor").await;
    let (student_token, _) = register_user(&app, "student").await;
    let course_id = create_course(&app, &instructor_token).await;

    let status_uri = format!("/api/courses/{}/enrollment", course_id);
    let enroll_uri = format!("/api/courses/{}/enroll", course_id);

    let (status, body) = send_json(&app, "GET", &status_uri, Some(&student_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enrolled"], false);

    let (status, body) = send_json(&app, "POST", &enroll_uri, Some(&student_token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["progress"], 0);

    // Second enroll for the same pair must conflict, not duplicate
    let (status, _) = send_json(&app, "POST", &enroll_uri, Some(&student_token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send_json(&app, "GET", &status_uri, Some(&student_token), None).await;
    assert_eq!(body["enrolled"], true);

    // Exactly one row feeds my-enrolled-courses
    let (status, body) = send_json(
        &app,
        "GET",
        "/api/courses/my-enrolled-courses",
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows: Vec<&Value> = body
        .as_array()
        .unwrap()
        .iter()
        .filter(|row| row["course"]["id"] == course_id.as_str())
        .collect();
    assert_eq!(rows.len(), 1);

    // Instructors are not enrollable
    let (status, _) = send_json(&app, "POST", &enroll_uri, Some(&instructor_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "requires a running MongoDB (cargo test -- --ignored)"]
async fn progress_updates_are_clamped() {
    let app = common::create_test_app().await;

    let (instructor_token, _) = register_user(&app, "instructor").await;
    let (student_token, _) = register_user(&app, "student").await;
    let course_id = create_course(&app, &instructor_token).await;

    let enroll_uri = format!("/api/courses/{}/enroll", course_id);
    let progress_uri = format!("/api/courses/{}/progress", course_id);

    send_json(&app, "POST", &enroll_uri, Some(&student_token), None).await;

    let (status, body) = send_json(
        &app,
        "POST",
        &progress_uri,
        Some(&student_token),
        Some(json!({ "progress": 150 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress"], 100);

    let (_, body) = send_json(
        &app,
        "POST",
        &progress_uri,
        Some(&student_token),
        Some(json!({ "progress": -5 })),
    )
    .await;
    assert_eq!(body["progress"], 0);
}

#[tokio::test]
#[ignore = "requires a running MongoDB (cargo test -- --ignored)"]
async fn quiz_submission_is_graded_positionally() {
    let app = common::create_test_app().await;

    let (instructor_token, _) = register_user(&app, "instructor").await;
    let (student_token, _) = register_user(&app, "student").await;
    let course_id = create_course(&app, &instructor_token).await;

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/courses/{}/quizzes", course_id),
        Some(&instructor_token),
        Some(json!({
            "title": "Checkpoint 1",
            "questions": [
                { "text": "1+1?", "choices": ["1", "2"], "correctChoice": 1 },
                { "text": "2+2?", "choices": ["4", "5"], "correctChoice": 0 },
                { "text": "3+3?", "choices": ["5", "6"], "correctChoice": 1 },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "add quiz failed: {}", body);
    let quiz_id = body["quizzes"][0]["id"].as_str().unwrap().to_string();
    // Correct answers are never serialized back
    assert!(body["quizzes"][0]["questions"][0]
        .get("correctChoice")
        .is_none());

    send_json(
        &app,
        "POST",
        &format!("/api/courses/{}/enroll", course_id),
        Some(&student_token),
        None,
    )
    .await;

    // Two of three correct; the third entry is null (unanswered)
    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/courses/{}/quizzes/{}/submit", course_id, quiz_id),
        Some(&student_token),
        Some(json!({ "answers": [1, 0, null] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["correct"], 2);
    assert_eq!(body["total"], 3);
    assert!((body["score"].as_f64().unwrap() - 66.67).abs() < 1e-9);

    // Unknown quiz id is NotFound
    let (status, _) = send_json(
        &app,
        "POST",
        &format!(
            "/api/courses/{}/quizzes/{}/submit",
            course_id, "ffffffffffffffffffffffff"
        ),
        Some(&student_token),
        Some(json!({ "answers": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires a running MongoDB (cargo test -- --ignored)"]
async fn locked_lessons_hide_content_from_outsiders() {
    let app = common::create_test_app().await;

    let (instructor_token, _) = register_user(&app, "instructor").await;
    let (student_token, _) = register_user(&app, "student").await;
    let course_id = create_course(&app, &instructor_token).await;

    for (title, is_free) in [("Welcome", true), ("Deep Dive", false)] {
        let (status, _) = send_json(
            &app,
            "POST",
            &format!("/api/courses/{}/lessons", course_id),
            Some(&instructor_token),
            Some(json!({
                "title": title,
                "type": "text",
                "content": format!("{} body", title),
                "duration": 10,
                "isFree": is_free,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let uri = format!("/api/courses/{}", course_id);

    // Anonymous viewer: free lesson open, paid lesson locked
    let (status, body) = send_json(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lessons"][0]["content"], "Welcome body");
    assert_eq!(body["lessons"][0]["locked"], false);
    assert!(body["lessons"][1].get("content").is_none());
    assert_eq!(body["lessons"][1]["locked"], true);

    // Non-enrolled student: same view
    let (_, body) = send_json(&app, "GET", &uri, Some(&student_token), None).await;
    assert!(body["lessons"][1].get("content").is_none());

    // Enrolled student sees everything
    send_json(
        &app,
        "POST",
        &format!("/api/courses/{}/enroll", course_id),
        Some(&student_token),
        None,
    )
    .await;
    let (_, body) = send_json(&app, "GET", &uri, Some(&student_token), None).await;
    assert_eq!(body["lessons"][1]["content"], "Deep Dive body");
    assert_eq!(body["lessons"][1]["locked"], false);

    // The owner always sees everything
    let (_, body) = send_json(&app, "GET", &uri, Some(&instructor_token), None).await;
    assert_eq!(body["lessons"][1]["content"], "Deep Dive body");
}

#[tokio::test]
#[ignore = "requires a running MongoDB (cargo test -- --ignored)"]
async fn upload_stores_file_and_returns_public_path() {
    let app = common::create_test_app().await;
    let (token, _) = register_user(&app, "instructor").await;

    let boundary = "test-boundary-7MA4YWxkTrZu0gW";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"thumb.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         fake-png-bytes\r\n\
         --{boundary}--\r\n"
    );

    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header("authorization", format!("Bearer {}", token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let path: String = serde_json::from_slice(&bytes).unwrap();
    assert!(path.starts_with("/uploads/"));
    assert!(path.ends_with(".png"));

    // The stored file is served back from the static route
    let fetch = Request::builder()
        .method("GET")
        .uri(&path)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(fetch).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"fake-png-bytes");

    // Uploading without a token is rejected
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
