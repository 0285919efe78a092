use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tracing::{Instrument, info, warn};
use uuid::Uuid;

use optic_core::planner::Availability;
use optic_core::{PlanRequest, PlanService};

use crate::config::OpticConfig;
use crate::response::{Reply, build_response};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(service: PlanService, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/plan", post(plan))
        .route("/ping", get(ping))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(service))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(config: OpticConfig) -> Result<()> {
    let service = PlanService::new(config.service.clone());

    let planner = &config.service.planner;
    match service.invoker().availability() {
        Availability::Available => info!(
            planner = %planner.executable.display(),
            timeout_secs = planner.timeout.as_secs(),
            "planner ready"
        ),
        Availability::Unavailable(reason) => {
            warn!(%reason, "planner unavailable at startup; /plan will fail until it is provisioned")
        }
    }

    let app = build_router(service, config.max_body_bytes);
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port).parse()?;
    info!("optic serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("optic serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn ping() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn not_found() -> Reply {
    Reply::rejected(StatusCode::NOT_FOUND, "not found")
}

async fn plan(
    State(service): State<Arc<PlanService>>,
    body: Result<Bytes, BytesRejection>,
) -> Reply {
    let request_id = Uuid::new_v4();
    async move {
        let body = match body {
            Ok(body) => body,
            Err(rejection) => {
                warn!(status = %rejection.status(), "failed to read request body");
                return Reply::rejected(rejection.status(), rejection.body_text());
            }
        };

        let request = match parse_request(&body) {
            Ok(request) => request,
            Err(reason) => {
                warn!(%reason, "rejected malformed plan request");
                return Reply::rejected(StatusCode::BAD_REQUEST, reason);
            }
        };
        info!(body_bytes = body.len(), "plan request received");

        build_response(service.plan(&request).await)
    }
    .instrument(tracing::info_span!("plan", %request_id))
    .await
}

/// Parse a `/plan` body. Anything but a JSON object is a malformed request.
fn parse_request(body: &[u8]) -> Result<PlanRequest, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err("missing request body: expected a JSON object".to_string());
    }
    let value: Value =
        serde_json::from_slice(body).map_err(|e| format!("invalid JSON body: {e}"))?;
    match value {
        Value::Object(_) => {
            serde_json::from_value(value).map_err(|e| format!("invalid plan request: {e}"))
        }
        Value::Null => Err("missing request body: expected a JSON object".to_string()),
        _ => Err("request body must be a JSON object".to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use optic_core::{PlanService, PlannerConfig, ServiceConfig};
    use optic_test_utils::StubPlanner;

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    struct TestApp {
        router: axum::Router,
        workspace_root: TempDir,
    }

    fn app_with(planner: &Path, timeout_secs: u64, max_body_bytes: usize) -> TestApp {
        let workspace_root = TempDir::new().unwrap();
        let service = PlanService::new(ServiceConfig {
            planner: PlannerConfig::new(planner, Duration::from_secs(timeout_secs)),
            workspace_root: Some(workspace_root.path().to_path_buf()),
        });
        TestApp {
            router: super::build_router(service, max_body_bytes),
            workspace_root,
        }
    }

    fn app(planner: &Path) -> TestApp {
        app_with(planner, 10, crate::config::DEFAULT_MAX_BODY_BYTES)
    }

    impl TestApp {
        async fn post_plan(&self, body: impl Into<Body>) -> axum::response::Response {
            self.router
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/plan")
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(body.into())
                        .unwrap(),
                )
                .await
                .unwrap()
        }

        async fn get(&self, uri: &str) -> axum::response::Response {
            self.router
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap()
        }

        fn assert_no_workspaces_left(&self) {
            let leftovers: Vec<PathBuf> = std::fs::read_dir(self.workspace_root.path())
                .unwrap()
                .map(|e| e.unwrap().path())
                .collect();
            assert!(leftovers.is_empty(), "workspaces left behind: {leftovers:?}");
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 16 * 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn assert_envelope(json: &serde_json::Value) {
        let obj = json.as_object().expect("response should be an object");
        assert_eq!(obj.len(), 3, "unexpected keys: {json}");
        assert!(obj["stdout"].is_string());
        assert!(obj["stderr"].is_string());
        assert!(obj["returncode"].is_i64());
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_ping_returns_ok() {
        let app = app(Path::new("/nonexistent/planner"));

        let resp = app.get("/ping").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_plan_with_echo_planner() {
        let stub = StubPlanner::echo_paths();
        let app = app(stub.path());

        let resp = app
            .post_plan(r#"{"domain_pddl": "(define (domain d))", "problem_pddl": "(define (problem p))"}"#)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_envelope(&json);
        assert_eq!(json["returncode"], 0);

        let stdout = json["stdout"].as_str().unwrap();
        let lines: Vec<&str> = stdout.lines().collect();
        assert_eq!(lines.len(), 2, "stdout: {stdout:?}");
        assert!(lines[0].ends_with("domain.pddl"));
        assert!(lines[1].ends_with("problem.pddl"));
        app.assert_no_workspaces_left();
    }

    #[tokio::test]
    async fn test_plan_accepts_wrapped_and_line_shapes() {
        let stub = StubPlanner::cat_files();
        let app = app(stub.path());

        let resp = app
            .post_plan(r#"{"domain_pddl": {"value": "D"}, "problem_pddl": ["line1", "line2"]}"#)
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["stdout"], "D\n---\nline1\nline2");
    }

    #[tokio::test]
    async fn test_plan_empty_object_runs_with_empty_files() {
        let stub = StubPlanner::exit_2_on_empty();
        let app = app(stub.path());

        let resp = app.post_plan("{}").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_envelope(&json);
        assert_eq!(json["returncode"], 2);
        app.assert_no_workspaces_left();
    }

    #[tokio::test]
    async fn test_plan_planner_failure_exit_code_passes_through() {
        let stub = StubPlanner::exit_with(1);
        let app = app(stub.path());

        let resp = app.post_plan(r#"{"domain_pddl": "d", "problem_pddl": "p"}"#).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["returncode"], 1);
        assert_eq!(json["stdout"], "out\n");
        assert_eq!(json["stderr"], "err\n");
    }

    #[tokio::test]
    async fn test_plan_missing_planner_is_500() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir.path().join("optic"));

        let resp = app.post_plan(r#"{"domain_pddl": "d", "problem_pddl": "p"}"#).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_envelope(&json);
        assert_eq!(json["returncode"], -1);
        assert_eq!(json["stdout"], "");
        assert!(json["stderr"].as_str().unwrap().contains("not found"));
        app.assert_no_workspaces_left();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_plan_timeout_is_500() {
        let pid_dir = TempDir::new().unwrap();
        let pid_file = pid_dir.path().join("pid");
        let stub = StubPlanner::sleeper(&pid_file);
        let app = app_with(stub.path(), 1, crate::config::DEFAULT_MAX_BODY_BYTES);

        let resp = app.post_plan("{}").await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_envelope(&json);
        assert_eq!(json["returncode"], -1);
        assert!(json["stderr"].as_str().unwrap().contains("timed out"));

        let pid: i32 = std::fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();
        assert!(!optic_test_utils::process_alive(pid));
        app.assert_no_workspaces_left();
    }

    #[tokio::test]
    async fn test_plan_invalid_json_is_400() {
        let stub = StubPlanner::echo_paths();
        let app = app(stub.path());

        let resp = app.post_plan(r#"{"domain_pddl": "#).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_envelope(&json);
        assert_eq!(json["returncode"], -1);
        assert!(json["stderr"].as_str().unwrap().contains("invalid JSON"));
        app.assert_no_workspaces_left();
    }

    #[tokio::test]
    async fn test_plan_empty_body_is_400() {
        let stub = StubPlanner::echo_paths();
        let app = app(stub.path());

        let resp = app.post_plan(Body::empty()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_envelope(&json);
        assert!(json["stderr"].as_str().unwrap().contains("missing request body"));
    }

    #[tokio::test]
    async fn test_plan_non_object_body_is_400() {
        let stub = StubPlanner::echo_paths();
        let app = app(stub.path());

        for body in ["null", "[1, 2]", "\"text\"", "42"] {
            let resp = app.post_plan(body).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
            assert_envelope(&body_json(resp).await);
        }
    }

    #[tokio::test]
    async fn test_plan_oversized_body_keeps_envelope() {
        let stub = StubPlanner::echo_paths();
        let app = app_with(stub.path(), 10, 64);

        let big = format!(r#"{{"domain_pddl": "{}"}}"#, "x".repeat(1024));
        let resp = app.post_plan(big).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_envelope(&body_json(resp).await);
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let app = app(Path::new("/nonexistent/planner"));

        let resp = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header(header::ORIGIN, "http://editor.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let allow = resp
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .expect("should have access-control-allow-origin header");
        assert_eq!(allow, "*");
    }

    #[tokio::test]
    async fn test_cors_preflight_for_plan() {
        let app = app(Path::new("/nonexistent/planner"));

        let resp = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/plan")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404_envelope() {
        let app = app(Path::new("/nonexistent/planner"));

        let resp = app.get("/solve").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_envelope(&json);
        assert_eq!(json["stderr"], "not found");
    }

    #[test]
    fn parse_request_accepts_any_field_shape() {
        let req = super::parse_request(br#"{"domain_pddl": {"nested": [1, 2]}, "problem_pddl": 3}"#)
            .unwrap();
        assert_eq!(req.domain_text(), r#"{"nested":[1,2]}"#);
        assert_eq!(req.problem_text(), "3");
    }
}
