//! HTTP control surface.
//!
//! Pairing, status, disconnect, send, logs, chats, health and a webhook stub,
//! plus the HTML dashboard at `/`. Every mutation is delegated to [`Lifecycle`].

use crate::dashboard;
use crate::lifecycle::{validate_phone, Lifecycle, PairOutcome};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use edison_core::error::EdisonError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

/// Service name reported by `/health`.
const SERVICE_NAME: &str = "whatsapp-bot";

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    lifecycle: Arc<Lifecycle>,
    port: u16,
    /// Include internal error detail in error bodies.
    dev_mode: bool,
}

impl ApiState {
    pub fn new(lifecycle: Arc<Lifecycle>, port: u16, dev_mode: bool) -> Self {
        Self {
            lifecycle,
            port,
            dev_mode,
        }
    }
}

type ApiError = (StatusCode, Json<Value>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(json!({"success": false, "error": message.into()})),
    )
}

/// 500 carrying `details` only in development mode.
fn internal_error(state: &ApiState, message: impl Into<String>, err: &EdisonError) -> ApiError {
    let mut body = json!({"success": false, "error": message.into()});
    if state.dev_mode {
        body["details"] = json!(format!("{err:?}"));
    }
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
}

#[derive(Debug, Deserialize)]
struct PairRequest {
    #[serde(rename = "phoneNumber")]
    phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    to: Option<String>,
    message: Option<String>,
}

/// `GET /`: dashboard.
async fn index(State(state): State<ApiState>) -> Html<String> {
    let snapshot = state.lifecycle.snapshot();
    let logs = state.lifecycle.activity().snapshot();
    Html(dashboard::render(&snapshot, &logs, state.port))
}

/// `POST /pair`: start a session and wait (bounded) for a pairing code.
async fn pair(
    State(state): State<ApiState>,
    body: Result<Json<PairRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let phone = body
        .ok()
        .and_then(|Json(req)| req.phone_number)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "Phone number is required"))?;

    validate_phone(&phone).map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;

    match state.lifecycle.request_pairing(&phone).await {
        Ok(PairOutcome::CodeIssued { code }) => Ok(Json(json!({
            "success": true,
            "pairingCode": code,
            "phoneNumber": phone,
            "message": "Enter this code in WhatsApp → Linked Devices → Link with phone number",
            "status": state.lifecycle.phase(),
        }))),
        Ok(PairOutcome::ConnectedDirectly { phone }) => Ok(Json(json!({
            "success": true,
            "message": "Connected successfully without pairing code",
            "status": state.lifecycle.phase(),
            "phone": phone,
        }))),
        Ok(PairOutcome::AlreadyConnected { phone }) => Ok(Json(json!({
            "success": false,
            "message": "Bot is already connected",
            "status": state.lifecycle.phase(),
            "connectedPhone": phone,
        }))),
        Err(EdisonError::Timeout(_)) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate pairing code. Please try again.",
        )),
        Err(EdisonError::Validation(msg)) => Err(error_response(StatusCode::BAD_REQUEST, msg)),
        Err(e) => {
            error!("Pairing error: {e}");
            state
                .lifecycle
                .activity()
                .push(format!("Pairing error: {e}"));
            Err(internal_error(&state, e.to_string(), &e))
        }
    }
}

/// `GET /status`: current connection state.
async fn status(State(state): State<ApiState>) -> Json<Value> {
    let snapshot = state.lifecycle.snapshot();
    Json(json!({
        "status": snapshot.phase(),
        "phone": snapshot.remote_identity(),
        "connected": snapshot.is_connected(),
        "pairingCode": snapshot.pairing_code(),
        "timestamp": snapshot.last_transition_at().to_rfc3339(),
        "uptime": state.lifecycle.uptime().as_secs_f64(),
    }))
}

/// `POST /disconnect`: log out and purge credentials. Idempotent.
async fn disconnect(State(state): State<ApiState>) -> Json<Value> {
    state.lifecycle.disconnect().await;
    Json(json!({
        "success": true,
        "message": "Disconnected successfully",
        "timestamp": state.lifecycle.snapshot().last_transition_at().to_rfc3339(),
    }))
}

/// `GET /health`: liveness with process details.
async fn health(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "service": SERVICE_NAME,
        "status": state.lifecycle.phase(),
        "timestamp": Utc::now().to_rfc3339(),
        "uptime": state.lifecycle.uptime().as_secs_f64(),
        "memory": { "rss": crate::process::resident_memory_bytes() },
        "version": env!("CARGO_PKG_VERSION"),
        "platform": std::env::consts::OS,
        "port": state.port,
    }))
}

/// `GET /logs`: activity log, oldest first.
async fn logs(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({ "logs": state.lifecycle.activity().snapshot() }))
}

/// `POST /logs/clear`: reset the activity log to its sentinel.
async fn clear_logs(State(state): State<ApiState>) -> Json<Value> {
    state.lifecycle.activity().clear();
    Json(json!({ "success": true, "message": "Logs cleared" }))
}

/// `POST /send`: send a text message through the live session.
async fn send(
    State(state): State<ApiState>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let (to, message) = match body {
        Ok(Json(SendRequest {
            to: Some(to),
            message: Some(message),
        })) if !to.is_empty() && !message.is_empty() => (to, message),
        _ => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "Recipient and message are required",
            ))
        }
    };

    match state.lifecycle.send_message(&to, &message).await {
        Ok(jid) => Ok(Json(json!({
            "success": true,
            "message": "Message sent successfully",
            "to": jid,
        }))),
        Err(EdisonError::Conflict(msg)) => Err(not_connected(&state, msg)),
        Err(e) => Err(internal_error(&state, e.to_string(), &e)),
    }
}

/// `GET /chats`: chats seen in inbound traffic, newest first.
async fn chats(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    match state.lifecycle.chats().await {
        Ok(chats) => Ok(Json(json!({
            "success": true,
            "count": chats.len(),
            "chats": chats,
        }))),
        Err(EdisonError::Conflict(msg)) => Err(not_connected(&state, msg)),
        Err(e) => Err(internal_error(&state, e.to_string(), &e)),
    }
}

fn not_connected(state: &ApiState, message: String) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "success": false,
            "error": message,
            "status": state.lifecycle.phase(),
        })),
    )
}

/// `POST /webhook`: accepted and acknowledged, not processed.
async fn webhook() -> Json<Value> {
    Json(json!({ "received": true, "timestamp": Utc::now().to_rfc3339() }))
}

async fn allow_any_origin(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

/// Build the axum router with shared state.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/pair", post(pair))
        .route("/status", get(status))
        .route("/disconnect", post(disconnect))
        .route("/health", get(health))
        .route("/logs", get(logs))
        .route("/logs/clear", post(clear_logs))
        .route("/send", post(send))
        .route("/chats", get(chats))
        .route("/webhook", post(webhook))
        .layer(axum::middleware::map_response(allow_any_origin))
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024)) // 1 MB max request body
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve(
    host: &str,
    state: ApiState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = format!("{host}:{}", state.port);
    let lifecycle = Arc::clone(&state.lifecycle);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let port = listener.local_addr()?.port();
    info!("Server running on http://{addr}");
    lifecycle
        .activity()
        .push(format!("Server started on port {port}"));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::fake::{Behaviour, FakeFactory};
    use crate::lifecycle::LifecycleOptions;
    use axum::body::Body;
    use axum::http::Request;
    use edison_core::traits::{CloseReason, SessionEvent};
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    const PHONE: &str = "5511999887766";

    struct Harness {
        app: Router,
        lifecycle: Arc<Lifecycle>,
        factory: Arc<FakeFactory>,
        _tmp: tempfile::TempDir,
    }

    fn harness(behaviour: Behaviour, dev_mode: bool) -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let factory = FakeFactory::new(behaviour);
        let options = LifecycleOptions {
            auth_dir: tmp.path().to_path_buf(),
            pair_timeout: Duration::from_millis(200),
            reconnect_delay: Duration::from_secs(60),
            activity_capacity: 50,
        };
        let lifecycle = Arc::new(Lifecycle::new(factory.clone(), options, None));
        let app = build_router(ApiState::new(lifecycle.clone(), 3001, dev_mode));
        Harness {
            app,
            lifecycle,
            factory,
            _tmp: tmp,
        }
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    /// Parse response body as JSON.
    async fn body_json(resp: Response) -> Value {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    async fn pair(h: &Harness, phone: &str) -> (StatusCode, Value) {
        let body = json!({ "phoneNumber": phone }).to_string();
        let resp = h.app.clone().oneshot(post_json("/pair", &body)).await.unwrap();
        let status = resp.status();
        (status, body_json(resp).await)
    }

    async fn wait_until(check: impl Fn() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    // --- /pair ---

    #[tokio::test]
    async fn test_pair_returns_code() {
        let h = harness(Behaviour::IssueCode("WXYZ-9876".into()), false);
        let (status, json) = pair(&h, PHONE).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["pairingCode"], "WXYZ-9876");
        assert_eq!(json["phoneNumber"], PHONE);
        assert_eq!(json["status"], "pairing");
    }

    #[tokio::test]
    async fn test_pair_missing_phone() {
        let h = harness(Behaviour::IssueCode("X".into()), false);
        for body in ["{}", "not json", r#"{"phoneNumber": ""}"#] {
            let resp = h.app.clone().oneshot(post_json("/pair", body)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let json = body_json(resp).await;
            assert_eq!(json["success"], false);
            assert_eq!(json["error"], "Phone number is required");
        }
        assert_eq!(h.factory.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_pair_malformed_phone() {
        let h = harness(Behaviour::IssueCode("X".into()), false);
        let (status, json) = pair(&h, "+55 11 9999").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("10-15 digits"));
        assert_eq!(h.factory.connect_count(), 0);
        assert_eq!(h.lifecycle.phase(), edison_core::state::Phase::Disconnected);
    }

    #[tokio::test]
    async fn test_pair_connected_directly_then_already_connected() {
        let h = harness(Behaviour::ConnectDirectly, false);
        let (status, json) = pair(&h, PHONE).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["status"], "connected");
        assert_eq!(json["phone"], PHONE);

        let (status, json) = pair(&h, PHONE).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Bot is already connected");
        assert_eq!(json["connectedPhone"], PHONE);
        assert_eq!(h.factory.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_pair_timeout_is_500() {
        let h = harness(Behaviour::Silent, false);
        let (status, json) = pair(&h, PHONE).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json["error"],
            "Failed to generate pairing code. Please try again."
        );
    }

    #[tokio::test]
    async fn test_pair_start_failure_details_only_in_dev_mode() {
        let h = harness(Behaviour::Fail, false);
        let (status, json) = pair(&h, PHONE).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("socket refused"));
        assert!(json.get("details").is_none());

        let h = harness(Behaviour::Fail, true);
        let (_, json) = pair(&h, PHONE).await;
        assert!(json["details"].as_str().is_some());
    }

    // --- /status, /health, /disconnect ---

    #[tokio::test]
    async fn test_status_initial() {
        let h = harness(Behaviour::Silent, false);
        let resp = h.app.clone().oneshot(get("/status")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "disconnected");
        assert_eq!(json["connected"], false);
        assert!(json["phone"].is_null());
        assert!(json["pairingCode"].is_null());
        assert!(json["timestamp"].is_string());
        assert!(json["uptime"].is_number());
    }

    #[tokio::test]
    async fn test_status_shows_code_while_pairing() {
        let h = harness(Behaviour::IssueCode("CODE-1".into()), false);
        pair(&h, PHONE).await;
        let json = body_json(h.app.clone().oneshot(get("/status")).await.unwrap()).await;
        assert_eq!(json["status"], "pairing");
        assert_eq!(json["pairingCode"], "CODE-1");
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(Behaviour::Silent, false);
        let resp = h.app.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["ok"], true);
        assert_eq!(json["service"], "whatsapp-bot");
        assert_eq!(json["status"], "disconnected");
        assert_eq!(json["port"], 3001);
        assert!(json["memory"].is_object());
        assert!(json["version"].is_string());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let h = harness(Behaviour::Silent, false);
        for _ in 0..2 {
            let resp = h
                .app
                .clone()
                .oneshot(Request::post("/disconnect").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let json = body_json(resp).await;
            assert_eq!(json["success"], true);
            assert_eq!(json["message"], "Disconnected successfully");
        }
        assert_eq!(h.lifecycle.phase(), edison_core::state::Phase::Disconnected);
    }

    // --- /logs ---

    #[tokio::test]
    async fn test_logs_clear_leaves_one_sentinel() {
        let h = harness(Behaviour::IssueCode("X".into()), false);
        pair(&h, PHONE).await;

        let json = body_json(h.app.clone().oneshot(get("/logs")).await.unwrap()).await;
        assert!(json["logs"].as_array().unwrap().len() > 1);

        let resp = h
            .app
            .clone()
            .oneshot(Request::post("/logs/clear").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["message"], "Logs cleared");

        let json = body_json(h.app.clone().oneshot(get("/logs")).await.unwrap()).await;
        assert_eq!(json["logs"], json!(["> Logs cleared"]));
    }

    // --- /send, /chats ---

    #[tokio::test]
    async fn test_send_requires_fields() {
        let h = harness(Behaviour::ConnectDirectly, false);
        pair(&h, PHONE).await;
        for body in [r#"{"to": "5511"}"#, r#"{"message": "hi"}"#, "{}"] {
            let resp = h.app.clone().oneshot(post_json("/send", body)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                body_json(resp).await["error"],
                "Recipient and message are required"
            );
        }
    }

    #[tokio::test]
    async fn test_send_while_not_connected() {
        let h = harness(Behaviour::IssueCode("X".into()), false);
        pair(&h, PHONE).await;
        let body = r#"{"to": "5511000000000", "message": "hi"}"#;
        let resp = h.app.clone().oneshot(post_json("/send", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Bot is not connected");
        assert_eq!(json["status"], "pairing");
        assert!(h.factory.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_normalizes_bare_number() {
        let h = harness(Behaviour::ConnectDirectly, false);
        pair(&h, PHONE).await;
        wait_until(|| !h.factory.sent().is_empty()).await;

        let body = r#"{"to": "5511000000000", "message": "hi"}"#;
        let resp = h.app.clone().oneshot(post_json("/send", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["to"], "5511000000000@s.whatsapp.net");
    }

    #[tokio::test]
    async fn test_send_failure_is_500() {
        let h = harness(Behaviour::ConnectDirectly, false);
        pair(&h, PHONE).await;
        wait_until(|| !h.factory.sent().is_empty()).await;
        h.factory.fail_next_sends(1);

        let body = r#"{"to": "5511000000000", "message": "hi"}"#;
        let resp = h.app.clone().oneshot(post_json("/send", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["success"], false);
    }

    #[tokio::test]
    async fn test_chats() {
        let h = harness(Behaviour::ConnectDirectly, false);
        let resp = h.app.clone().oneshot(get("/chats")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        pair(&h, PHONE).await;
        let resp = h.app.clone().oneshot(get("/chats")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 0);
    }

    #[tokio::test]
    async fn test_logout_close_is_reflected_in_status() {
        let h = harness(Behaviour::ConnectDirectly, false);
        pair(&h, PHONE).await;
        h.factory.close(CloseReason::LoggedOut).await;
        let lifecycle = h.lifecycle.clone();
        wait_until(move || lifecycle.phase() == edison_core::state::Phase::Disconnected).await;

        let json = body_json(h.app.clone().oneshot(get("/status")).await.unwrap()).await;
        assert_eq!(json["status"], "disconnected");
        assert!(json["phone"].is_null());

        // Events from the released session are ignored.
        h.factory.emit(SessionEvent::Open).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!h.lifecycle.snapshot().is_connected());
    }

    // --- misc ---

    #[tokio::test]
    async fn test_webhook_acknowledges() {
        let h = harness(Behaviour::Silent, false);
        let resp = h
            .app
            .clone()
            .oneshot(post_json("/webhook", r#"{"anything": [1, 2, 3]}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["received"], true);
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_dashboard_and_cors_header() {
        let h = harness(Behaviour::Silent, false);
        let resp = h.app.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("<html"));
        assert!(html.contains("disconnected"));

        let resp = h.app.clone().oneshot(get("/nope")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }
}
