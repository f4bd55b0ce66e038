use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::ApiError,
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::enrollment::{EnrollmentStatus, UpdateProgressRequest},
    services::{enrollment_service::EnrollmentService, AppState},
};

/// GET /api/courses/:id/enrollment - Whether the acting student is enrolled
pub async fn check_enrollment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let enrolled = EnrollmentService::new(state.mongo.clone())
        .check_enrollment(&claims, &course_id)
        .await?;
    Ok(Json(EnrollmentStatus { enrolled }))
}

/// POST /api/courses/:id/enroll - Enroll the acting student (409 on repeat)
pub async fn enroll(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let enrollment = EnrollmentService::new(state.mongo.clone())
        .enroll(&claims, &course_id)
        .await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// POST /api/courses/:id/progress - Set own progress, clamped to [0, 100]
pub async fn update_progress(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<UpdateProgressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let enrollment = EnrollmentService::new(state.mongo.clone())
        .update_progress(&claims, &course_id, req.progress)
        .await?;
    Ok(Json(enrollment))
}
