use std::{any::Any, sync::Arc};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::error;

use issue_desk_notify::NotifyClient;
use issue_desk_storage::Database;

use crate::error::ApiError;
use crate::service::{Clock, IssueService};
use crate::{issues, telemetry};

const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const ALLOW_HEADERS: &str =
    "Origin, Content-Type, Content-Length, Accept-Encoding, X-CSRF-Token, Authorization";

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    issues: IssueService,
    notifier: Option<NotifyClient>,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle, storage: Database, notifier: Option<NotifyClient>) -> Self {
        let clock: Clock = Arc::new(Utc::now);
        Self {
            metrics,
            issues: IssueService::new(&storage, clock),
            notifier,
        }
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn issues(&self) -> &IssueService {
        &self.issues
    }

    pub fn notifier(&self) -> Option<&NotifyClient> {
        self.notifier.as_ref()
    }
}

pub fn app_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/issue", post(issues::create))
        .route("/issues", get(issues::list))
        .route(
            "/issue/:id",
            get(issues::get_one).patch(issues::update_status),
        );

    let routes = Router::new()
        .nest("/api/v1", api)
        .route("/health", get(health))
        .route("/metrics", get(metrics));

    with_middleware(routes).with_state(state)
}

fn with_middleware<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(cors))
        .layer(TraceLayer::new_for_http())
}

/// Turns a panicking handler into a 500 with the usual error body.
fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    error!(stage = "http", panic = detail, "request handler panicked");
    ApiError::Internal.into_response()
}

/// Allows every origin and answers preflight requests without reaching a handler.
async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    message: &'static str,
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        message: "server is running",
    })
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    pub(crate) async fn setup_state() -> AppState {
        setup_state_with(None).await
    }

    pub(crate) async fn setup_state_with(notifier: Option<NotifyClient>) -> AppState {
        let metrics = telemetry::init_metrics().expect("metrics init");
        let database = Database::connect("sqlite::memory:")
            .await
            .expect("connect");
        database.run_migrations().await.expect("migrations");

        AppState::new(metrics, database, notifier)
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .expect("body should read")
            .to_bytes()
            .to_vec()
    }

    #[tokio::test]
    async fn health_returns_ok_payload() {
        let app = app_router(setup_state().await);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).expect("json");
        assert_eq!(body, json!({ "status": "ok", "message": "server is running" }));
    }

    #[tokio::test]
    async fn metrics_exports_build_info() {
        let app = app_router(setup_state().await);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let body = String::from_utf8(body_bytes(response).await).expect("utf-8");
        assert!(body.contains("app_build_info"));
        assert!(body.contains("app_uptime_seconds"));
    }

    #[tokio::test]
    async fn preflight_is_answered_with_no_content() {
        let app = app_router(setup_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/v1/issue/1")
                    .header(header::ORIGIN, "https://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        assert!(response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .expect("ascii")
            .contains("PATCH"));
        assert!(body_bytes(response).await.is_empty());
    }

    async fn explode() -> &'static str {
        panic!("handler exploded")
    }

    #[tokio::test]
    async fn handler_panic_becomes_internal_error() {
        let app = with_middleware(Router::new().route("/boom", get(explode)));

        let response = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        let body: Value = serde_json::from_slice(&body_bytes(response).await).expect("json");
        assert_eq!(body, json!({ "error": "internal server error" }));
    }

    #[tokio::test]
    async fn regular_responses_carry_cors_headers() {
        let app = app_router(setup_state().await);

        let response = app
            .oneshot(Request::builder().uri("/api/v1/issues").body(Body::empty()).unwrap())
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }
}
