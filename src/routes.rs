// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{assessment, attempt, auth, progress},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Auth routes are public; everything else requires a bearer token.
/// * Applies global middleware (Trace, CORS).
/// * Injects the shared `AppState`.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Skipping invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let assessment_routes = Router::new()
        .route(
            "/{id}/attempt",
            get(attempt::check_attempt).post(attempt::submit_attempt),
        )
        .route("/{id}/questions", get(assessment::get_questions))
        .route("/{id}/review", get(attempt::review_attempt));

    let unit_routes = Router::new()
        .route("/{id}/progress", get(progress::get_unit_progress))
        .route("/{id}/assessments", post(assessment::create_assessment));

    let protected = Router::new()
        .nest("/api/assessments", assessment_routes)
        .nest("/api/units", unit_routes)
        .route("/api/attempts/me", get(attempt::list_my_attempts))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .merge(protected)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::{config::Config, store::MemoryStore};

    fn app() -> Router {
        create_router(AppState::new(
            Arc::new(MemoryStore::new()),
            Config::for_tests("secret"),
        ))
    }

    #[tokio::test]
    async fn test_protected_routes_need_a_token() {
        for uri in [
            "/api/assessments/1/attempt",
            "/api/assessments/1/questions",
            "/api/assessments/1/review",
            "/api/attempts/me",
            "/api/units/1/progress",
        ] {
            let response = app()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = app()
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
