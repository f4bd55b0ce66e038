use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::AppJson,
    middlewares::auth::{JwtClaims, JwtService},
    models::user::{LoginRequest, RegisterRequest},
    services::{auth_service::AuthService, AppState},
};

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(
        state.mongo.clone(),
        JwtService::new(&state.config.jwt_secret),
        state.config.jwt_ttl_seconds,
    )
}

/// POST /api/auth/register - Register a new user
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    tracing::info!("Registering new user: {}", req.email);

    let response = auth_service(&state).register(req).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/auth/login - Login with email and password
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    tracing::info!("Login attempt for user: {}", req.email);

    let response = auth_service(&state).login(req).await?;

    Ok(Json(response))
}

/// GET /api/auth/me - Current profile
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = auth_service(&state).current_profile(&claims).await?;
    Ok(Json(profile))
}
