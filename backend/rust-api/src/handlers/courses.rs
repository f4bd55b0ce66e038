use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::course::{
        AddAssignmentRequest, AddLessonRequest, AddQuizRequest, CreateCourseRequest,
        QuizSubmissionRequest, UpdateCourseRequest,
    },
    services::{course_service::CourseService, quiz_service::QuizService, AppState},
};

/// GET /api/courses - Browse courses (auth optional)
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let courses = CourseService::new(state.mongo.clone()).list_courses().await?;
    Ok(Json(courses))
}

/// GET /api/courses/:id - Course detail; lesson gating depends on the viewer
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<JwtClaims>>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = claims.as_ref().map(|Extension(claims)| claims);
    let course = CourseService::new(state.mongo.clone())
        .get_course(viewer, &course_id)
        .await?;
    Ok(Json(course))
}

/// POST /api/courses - Create course (instructor/admin)
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let course = CourseService::new(state.mongo.clone())
        .create_course(&claims, req)
        .await?;

    Ok((StatusCode::CREATED, Json(course)))
}

/// GET /api/courses/my-created-courses - Courses owned by the actor
pub async fn list_created_courses(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let courses = CourseService::new(state.mongo.clone())
        .list_created_courses(&claims)
        .await?;
    Ok(Json(courses))
}

/// GET /api/courses/my-enrolled-courses - The actor's enrollments + courses
pub async fn list_enrolled_courses(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = CourseService::new(state.mongo.clone())
        .list_enrolled_courses(&claims)
        .await?;
    Ok(Json(rows))
}

/// PUT /api/courses/:id - Update course (owner/admin)
pub async fn update_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<UpdateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let course = CourseService::new(state.mongo.clone())
        .update_course(&claims, &course_id, req)
        .await?;
    Ok(Json(course))
}

/// DELETE /api/courses/:id - Delete course (owner/admin)
pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    CourseService::new(state.mongo.clone())
        .delete_course(&claims, &course_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/courses/:id/lessons - Append lesson (owner/admin)
pub async fn add_lesson(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<AddLessonRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let course = CourseService::new(state.mongo.clone())
        .add_lesson(&claims, &course_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// POST /api/courses/:id/quizzes - Append quiz (owner/admin)
pub async fn add_quiz(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<AddQuizRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let course = CourseService::new(state.mongo.clone())
        .add_quiz(&claims, &course_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// POST /api/courses/:id/assignments - Append assignment (owner/admin)
pub async fn add_assignment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<AddAssignmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let course = CourseService::new(state.mongo.clone())
        .add_assignment(&claims, &course_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// POST /api/courses/:id/quizzes/:quiz_id/submit - Grade a submission (student)
pub async fn submit_quiz(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path((course_id, quiz_id)): Path<(String, String)>,
    AppJson(req): AppJson<QuizSubmissionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = QuizService::new(state.mongo.clone())
        .submit_quiz(&claims, &course_id, &quiz_id, &req.answers)
        .await?;
    Ok(Json(result))
}
