//! Axum-based HTTP gateway.
//!
//! - Public routes: `/health`, `/auth/register`, `/auth/login`
//! - Protected routes (bearer token required): `/auth/me`, `/api/*`
//! - Request body size limit (64KB) and request timeout (30s)
//! - Internal error detail is attached to 500 responses outside production

pub mod auth;
pub mod records;

use crate::auth::{require_auth, AuthService, PasswordHasher, TokenIssuer, UserStore};
use crate::config::Config;
use crate::db::Database;
use crate::error::ErrorDetail;
use crate::records::Repositories;
use anyhow::{Context, Result};
use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub records: Arc<Repositories>,
    /// Include internal error text in 500 bodies (non-production only).
    pub expose_error_detail: bool,
}

impl AppState {
    /// Build every service over an already-open database.
    pub fn new(db: &Database, config: &Config) -> Result<Self> {
        let secret = config.signing_secret()?;
        let users = UserStore::new(db.clone()).context("failed to prepare users table")?;
        let auth = AuthService::new(
            users,
            PasswordHasher::new(config.bcrypt_cost),
            TokenIssuer::new(secret.as_bytes(), config.token_ttl_days),
        )?;
        let records = Repositories::new(db).context("failed to prepare record tables")?;

        Ok(Self {
            auth: Arc::new(auth),
            records: Arc::new(records),
            expose_error_detail: !config.is_production(),
        })
    }
}

/// The full route set with middleware applied.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(auth::handle_me))
        .route(
            "/api/save-answers",
            post(records::handle_save_answers).get(records::handle_list_answers),
        )
        .route(
            "/api/journal",
            post(records::handle_save_journal).get(records::handle_list_journal),
        )
        .route(
            "/api/save-muscles",
            post(records::handle_save_muscles).get(records::handle_get_muscles),
        )
        .route(
            "/api/story-answers",
            post(records::handle_save_journey).get(records::handle_list_journeys),
        )
        .route(
            "/api/savePostExperience",
            post(records::handle_save_post_experience).get(records::handle_list_post_experiences),
        )
        .route(
            "/api/saveAudio",
            post(records::handle_save_audio).get(records::handle_list_audio),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.auth),
            require_auth,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(handle_health))
        .route("/auth/register", post(auth::handle_register))
        .route("/auth/login", post(auth::handle_login))
        .merge(protected)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            attach_error_detail,
        ))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Run the HTTP API until Ctrl+C / SIGTERM.
pub async fn run_gateway(config: Config) -> Result<()> {
    let db = Database::open(&config.database_url)
        .with_context(|| format!("cannot open storage at {}", config.database_url))?;
    let state = AppState::new(&db, &config)?;
    let users = state.auth.users().user_count()?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(
        %addr,
        users,
        environment = ?config.environment,
        "Luminate API listening"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// GET /health (public)
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Re-render 500 bodies with their detail when running outside production.
async fn attach_error_detail(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !state.expose_error_detail {
        return response;
    }
    match response.extensions().get::<ErrorDetail>().cloned() {
        Some(ErrorDetail(detail)) => (
            response.status(),
            Json(serde_json::json!({
                "message": "Internal server error",
                "detail": detail,
            })),
        )
            .into_response(),
        None => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const SECRET: &str = "gateway-test-secret-0123456789abcdef";

    fn test_config(production: bool) -> Config {
        Config {
            jwt_secret: Some(SECRET.into()),
            database_url: ":memory:".into(),
            bcrypt_cost: 4,
            environment: if production {
                crate::config::Environment::Production
            } else {
                crate::config::Environment::Development
            },
            ..Config::default()
        }
    }

    fn test_app_with(production: bool) -> (Database, Router) {
        let db = Database::open_in_memory().unwrap();
        let state = AppState::new(&db, &test_config(production)).unwrap();
        (db, build_router(state))
    }

    fn test_app() -> Router {
        test_app_with(false).1
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = HttpRequest::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn register(app: &Router, email: &str, password: &str, name: &str) -> (StatusCode, Value) {
        send(
            app,
            "POST",
            "/auth/register",
            None,
            Some(json!({ "email": email, "password": password, "name": name })),
        )
        .await
    }

    async fn token_for(app: &Router, email: &str) -> String {
        let (status, body) = register(app, email, "secret1", "Tester").await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().unwrap().to_string()
    }

    #[test]
    fn security_body_limit_is_64kb() {
        assert_eq!(MAX_BODY_SIZE, 65_536);
    }

    #[test]
    fn app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn app_state_requires_secret() {
        let db = Database::open_in_memory().unwrap();
        let config = Config {
            jwt_secret: None,
            ..test_config(false)
        };
        assert!(AppState::new(&db, &config).is_err());
    }

    #[tokio::test]
    async fn health_is_public() {
        let (status, body) = send(&test_app(), "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn register_then_me_then_garbage() {
        let app = test_app();

        let (status, body) = register(&app, "a@b.com", "secret1", "A").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "a@b.com");
        assert_eq!(body["user"]["name"], "A");
        assert!(body["user"].get("password").is_none());
        assert!(body["user"].get("password_hash").is_none());
        let token = body["token"].as_str().unwrap().to_string();

        let (status, me) = send(&app, "GET", "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "a@b.com");
        assert_eq!(me["name"], "A");
        assert_eq!(me["userId"], body["user"]["id"]);

        let (status, _) = send(&app, "GET", "/auth/me", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_or_malformed_header_is_401() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "No auth token found. Please log in.");

        let request = HttpRequest::builder()
            .uri("/auth/me")
            .header(header::AUTHORIZATION, "Token abc")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_token_is_401() {
        let db = Database::open_in_memory().unwrap();
        let state = AppState::new(&db, &test_config(false)).unwrap();
        let app = build_router(state.clone());

        let token = token_for(&app, "a@b.com").await;
        let claims = state.auth.tokens().verify(&token).unwrap();
        let stale = state
            .auth
            .tokens()
            .issue_at(
                &claims.user_id,
                &claims.email,
                chrono::Utc::now() - chrono::Duration::days(8),
            )
            .unwrap();

        let (status, body) = send(&app, "GET", "/auth/me", Some(&stale), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid or expired token. Please log in again.");
    }

    #[tokio::test]
    async fn token_for_deleted_user_is_404() {
        let (db, app) = test_app_with(false);
        let token = token_for(&app, "gone@b.com").await;

        db.lock().execute("DELETE FROM users", []).unwrap();

        let (status, body) = send(&app, "GET", "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");
    }

    #[tokio::test]
    async fn duplicate_registration_is_400() {
        let app = test_app();
        register(&app, "A@x.com", "secret1", "A").await;

        let (status, body) = register(&app, "a@x.com ", "secret2", "B").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "User already exists");
    }

    #[tokio::test]
    async fn register_validation_is_field_level() {
        let app = test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({ "email": "a@b.com", "password": "123" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields: Vec<_> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(fields, ["password", "name"]);
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let app = test_app();
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_success_and_uniform_failures() {
        let app = test_app();
        register(&app, "a@b.com", "secret1", "A").await;

        let (status, body) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "A@B.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap();
        let (status, _) = send(&app, "GET", "/auth/me", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (wrong_status, wrong_body) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "a@b.com", "password": "nope123" })),
        )
        .await;
        let (unknown_status, unknown_body) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "email": "ghost@b.com", "password": "secret1" })),
        )
        .await;
        assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_status, unknown_status);
        assert_eq!(wrong_body, unknown_body);
    }

    #[tokio::test]
    async fn api_routes_require_token() {
        let app = test_app();
        for (method, uri) in [
            ("POST", "/api/save-answers"),
            ("GET", "/api/journal"),
            ("POST", "/api/save-muscles"),
            ("POST", "/api/story-answers"),
            ("POST", "/api/savePostExperience"),
            ("POST", "/api/saveAudio"),
        ] {
            let (status, _) = send(&app, method, uri, None, Some(json!({}))).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn onboarding_answers_are_owned_by_caller() {
        let app = test_app();
        let alice = token_for(&app, "alice@x.com").await;
        let bob = token_for(&app, "bob@x.com").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/save-answers",
            Some(&alice),
            Some(json!({
                "email": "bob@x.com",
                "responses": [{ "question": "Experience?", "answer": "First time" }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Answers saved successfully!");
        assert_eq!(body["data"]["email"], "alice@x.com");

        let (_, bob_list) = send(&app, "GET", "/api/save-answers", Some(&bob), None).await;
        assert_eq!(bob_list, json!([]));
        let (_, alice_list) = send(&app, "GET", "/api/save-answers", Some(&alice), None).await;
        assert_eq!(alice_list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn onboarding_rejects_non_array() {
        let app = test_app();
        let token = token_for(&app, "a@b.com").await;
        let (status, _) = send(
            &app,
            "POST",
            "/api/save-answers",
            Some(&token),
            Some(json!({ "responses": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn journal_entry_round_trip() {
        let app = test_app();
        let token = token_for(&app, "a@b.com").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/journal",
            Some(&token),
            Some(json!({ "journalEntry": {
                "medicine": "Psilocybin",
                "intention": "Clarity",
                "experienceDate": "2024-03-09T10:00:00.000Z",
                "currentState": "Calm",
                "postExperience": "Open"
            }})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["experienceDate"], "2024-03-09");

        let (status, list) = send(&app, "GET", "/api/journal", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list[0]["medicine"], "Psilocybin");
    }

    #[tokio::test]
    async fn journal_rejects_bad_date() {
        let app = test_app();
        let token = token_for(&app, "a@b.com").await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/journal",
            Some(&token),
            Some(json!({ "journalEntry": {
                "medicine": "m", "intention": "i", "experienceDate": "someday",
                "currentState": "c", "postExperience": "p"
            }})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid experience date.");
    }

    #[tokio::test]
    async fn muscles_upsert_and_validate() {
        let app = test_app();
        let token = token_for(&app, "a@b.com").await;

        let (status, _) = send(&app, "GET", "/api/save-muscles", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            "POST",
            "/api/save-muscles",
            Some(&token),
            Some(json!({ "selectedMuscles": [" chest", "abs"] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["selectedMuscles"], json!(["CHEST", "ABS"]));

        send(
            &app,
            "POST",
            "/api/save-muscles",
            Some(&token),
            Some(json!({ "selectedMuscles": ["neck"] })),
        )
        .await;
        let (_, current) = send(&app, "GET", "/api/save-muscles", Some(&token), None).await;
        assert_eq!(current["selectedMuscles"], json!(["NECK"]));

        let (status, body) = send(
            &app,
            "POST",
            "/api/save-muscles",
            Some(&token),
            Some(json!({ "selectedMuscles": ["wings"] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid muscles: WINGS");
    }

    #[tokio::test]
    async fn journey_and_notes_are_saved() {
        let app = test_app();
        let token = token_for(&app, "a@b.com").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/story-answers",
            Some(&token),
            Some(json!({ "levels": [{
                "title": "Onset",
                "questionAnswers": [{ "question": "Feeling?", "answer": "Warm" }]
            }]})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["levels"][0]["title"], "Onset");

        let (status, _) = send(
            &app,
            "POST",
            "/api/savePostExperience",
            Some(&token),
            Some(json!({ "journalEntry": { "postExperience": "Integrated" } })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &app,
            "POST",
            "/api/saveAudio",
            Some(&token),
            Some(json!({ "postExperience": "file:///note.m4a" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["audio"], "file:///note.m4a");

        let (_, audio) = send(&app, "GET", "/api/saveAudio", Some(&token), None).await;
        assert_eq!(audio.as_array().unwrap().len(), 1);
        let (_, posts) = send(&app, "GET", "/api/savePostExperience", Some(&token), None).await;
        assert_eq!(posts[0]["postExperience"], "Integrated");
    }

    #[tokio::test]
    async fn internal_detail_depends_on_environment() {
        for production in [false, true] {
            let (db, app) = test_app_with(production);
            let token = token_for(&app, "a@b.com").await;
            db.lock().execute("DROP TABLE journal_entries", []).unwrap();

            let (status, body) = send(&app, "GET", "/api/journal", Some(&token), None).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body["message"], "Internal server error");
            assert_eq!(body.get("detail").is_some(), !production);
        }
    }
}
