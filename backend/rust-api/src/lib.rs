use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod authz;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::AppState;

/// Upload bodies beyond this are rejected before reaching the handler
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; \
             img-src 'self' data: https:; \
             media-src 'self'; \
             connect-src 'self'",
        ),
    );
    response
}

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    // CORS for the SPA: explicit origin allow-list with credentials
    let origins: Vec<HeaderValue> = app_state
        .config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true);

    Router::new()
        // Public endpoints (no auth required)
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        // Auth endpoints (mixed: some public, some protected)
        .nest("/api/auth", auth_routes(app_state.clone()))
        // Course, enrollment and quiz endpoints
        .nest("/api/courses", course_routes(app_state.clone()))
        // File upload (bearer required), served back under /uploads
        .route(
            "/api/upload",
            post(handlers::uploads::upload)
                .layer::<_, std::convert::Infallible>(middleware::from_fn_with_state(
                    app_state.clone(),
                    middlewares::auth::auth_middleware,
                ))
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .nest_service(
            "/uploads",
            ServeDir::new(&app_state.config.uploads_dir),
        )
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(csp_middleware))
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn auth_routes(
    app_state: std::sync::Arc<services::AppState>,
) -> Router<std::sync::Arc<services::AppState>> {
    let public_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Protected routes (require JWT auth)
    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::me))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ));

    public_routes.merge(protected_routes)
}

fn course_routes(
    app_state: std::sync::Arc<services::AppState>,
) -> Router<std::sync::Arc<services::AppState>> {
    // Browse endpoints validate a bearer token when present so owners and
    // enrolled students see their own locked lesson content
    let browse_routes = Router::new()
        .route("/", get(handlers::courses::list_courses))
        .route("/{id}", get(handlers::courses::get_course))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::auth::optional_auth_middleware,
        ));

    let protected_routes = Router::new()
        .route("/", post(handlers::courses::create_course))
        .route(
            "/my-created-courses",
            get(handlers::courses::list_created_courses),
        )
        .route(
            "/my-enrolled-courses",
            get(handlers::courses::list_enrolled_courses),
        )
        .route(
            "/{id}",
            put(handlers::courses::update_course).delete(handlers::courses::delete_course),
        )
        .route(
            "/{id}/enrollment",
            get(handlers::enrollments::check_enrollment),
        )
        .route("/{id}/enroll", post(handlers::enrollments::enroll))
        .route("/{id}/progress", post(handlers::enrollments::update_progress))
        .route("/{id}/lessons", post(handlers::courses::add_lesson))
        .route("/{id}/quizzes", post(handlers::courses::add_quiz))
        .route("/{id}/assignments", post(handlers::courses::add_assignment))
        .route(
            "/{id}/quizzes/{quiz_id}/submit",
            post(handlers::courses::submit_quiz),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ));

    browse_routes.merge(protected_routes)
}
