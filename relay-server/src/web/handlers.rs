//! HTTP endpoint handlers.
//!
//! OTP handlers answer with `{success, message}`; relay handlers either
//! mirror the upstream response or acknowledge it in the same envelope.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::otp::OtpService;
use crate::relay::{Channel, Relay};
use crate::web::error::AppError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub otp: OtpService,
    pub relay: Relay,
}

impl AppState {
    pub fn new(otp: OtpService, relay: Relay) -> Self {
        Self { otp, relay }
    }
}

/// Success envelope for OTP endpoints.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

// =============================================================================
// Health Check
// =============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub channels: Vec<ChannelStatus>,
}

#[derive(Serialize)]
pub struct ChannelStatus {
    pub channel: Channel,
    pub targets: Vec<String>,
}

/// Root status page listing the configured relay targets.
pub async fn index(State(state): State<AppState>) -> Json<StatusResponse> {
    let channels = Channel::ALL
        .into_iter()
        .map(|channel| ChannelStatus {
            channel,
            targets: state
                .relay
                .target(channel)
                .map(|t| t.urls.iter().map(|u| u.to_string()).collect())
                .unwrap_or_default(),
        })
        .collect();

    Json(StatusResponse {
        status: "Server is running",
        channels,
    })
}

/// Unmatched routes.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}

// =============================================================================
// OTP
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "code")]
    pub otp: String,
}

/// Issue a verification code for an email address.
pub async fn send_otp(
    State(state): State<AppState>,
    payload: Result<Json<SendOtpRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    state.otp.request_code(&req.email).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "OTP sent to your email",
    }))
}

/// Check a submitted verification code.
pub async fn verify_otp(
    State(state): State<AppState>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    state.otp.verify_code(&req.email, &req.otp).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Email verified successfully",
    }))
}

// =============================================================================
// Relay
// =============================================================================

/// Reject bodies that are not JSON; the bytes themselves are forwarded untouched.
fn ensure_json(body: &[u8]) -> Result<(), AppError> {
    serde_json::from_slice::<serde::de::IgnoredAny>(body)
        .map(|_| ())
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON payload: {}", e)))
}

/// Transparent proxy: forwards the body and mirrors the upstream response.
pub async fn webhook(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let channel: Channel = channel.parse().map_err(|_| AppError::NotFound)?;
    ensure_json(&body)?;

    info!(channel = %channel, body_length = body.len(), "webhook_received");

    let outcome = state.relay.forward(channel, body).await?;

    let mut response = (outcome.status, outcome.body).into_response();
    match outcome
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
    {
        Some(value) => {
            response.headers_mut().insert(CONTENT_TYPE, value);
        }
        None => {
            response.headers_mut().remove(CONTENT_TYPE);
        }
    }

    Ok(response)
}

/// Acknowledgement for the `/api/*` submission endpoints.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub success: bool,
    pub message: String,
    pub upstream_status: u16,
}

/// Map `/api/orders` style collection names to channels.
fn channel_for_collection(collection: &str) -> Option<Channel> {
    collection.strip_suffix('s')?.parse().ok()
}

/// Forward a submission and answer with a normalized envelope.
///
/// Any upstream response counts as delivered; only unreachable targets fail.
pub async fn submit(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    body: Bytes,
) -> Result<Json<SubmissionResponse>, AppError> {
    let channel = channel_for_collection(&collection).ok_or(AppError::NotFound)?;
    ensure_json(&body)?;

    info!(channel = %channel, body_length = body.len(), "submission_received");

    let outcome = state.relay.forward(channel, body).await?;
    if !outcome.is_upstream_ok() {
        warn!(
            channel = %channel,
            status_code = outcome.status.as_u16(),
            "submission_upstream_non_ok"
        );
    }

    Ok(Json(SubmissionResponse {
        success: true,
        message: format!("{} submitted successfully", channel.label()),
        upstream_status: outcome.status.as_u16(),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use reqwest::Client;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use url::Url;

    use super::*;
    use crate::otp::{CodeMailer, OtpStore};
    use crate::relay::testing::{refused_url, spawn_upstream, test_client};
    use crate::relay::RelayTarget;
    use crate::web::router;

    async fn spawn_app(order_urls: Vec<Url>) -> (String, AppState) {
        let otp = OtpService::new(OtpStore::new(Duration::from_secs(300)), CodeMailer::Log);
        let relay = Relay::new(
            test_client(),
            vec![RelayTarget::new(Channel::Order, order_urls)],
        );
        let state = AppState::new(otp, relay);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), state)
    }

    #[tokio::test]
    async fn test_health() {
        let (base, _) = spawn_app(vec![]).await;
        let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_otp_round_trip_over_http() {
        let (base, state) = spawn_app(vec![]).await;
        let client = Client::new();

        let resp = client
            .post(format!("{}/send-otp", base))
            .json(&json!({ "email": "A@B.com" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.json::<Value>().await.unwrap()["success"], json!(true));

        let code = state.otp.store().pending_code("a@b.com").await.unwrap();

        let resp = client
            .post(format!("{}/verify-otp", base))
            .json(&json!({ "email": "a@b.com", "otp": code }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = client
            .post(format!("{}/verify-otp", base))
            .json(&json!({ "email": "a@b.com", "otp": code }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = resp.json::<Value>().await.unwrap();
        assert_eq!(body["success"], json!(false));
        assert_eq!(
            body["error"],
            json!("No pending verification code for this email")
        );
    }

    #[tokio::test]
    async fn test_send_otp_rejects_bad_input() {
        let (base, _) = spawn_app(vec![]).await;
        let client = Client::new();

        let resp = client
            .post(format!("{}/send-otp", base))
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.json::<Value>().await.unwrap()["error"], json!("Email is required"));

        let resp = client
            .post(format!("{}/send-otp", base))
            .header(CONTENT_TYPE, "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_mirrors_upstream() {
        let upstream = spawn_upstream(StatusCode::CREATED).await;
        let (base, _) = spawn_app(vec![upstream.url.clone()]).await;

        let resp = Client::new()
            .post(format!("{}/webhook/order", base))
            .header("origin", "http://localhost:8080")
            .header(CONTENT_TYPE, "application/json")
            .body(r#"{"body":{"name":"Ana","items":[1,2]}}"#)
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
        assert_eq!(
            resp.text().await.unwrap(),
            r#"{"body":{"name":"Ana","items":[1,2]}}"#
        );
        assert_eq!(upstream.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_webhook_refused_primary_uses_fallback() {
        let fallback = spawn_upstream(StatusCode::OK).await;
        let (base, _) = spawn_app(vec![refused_url().await, fallback.url.clone()]).await;

        let resp = Client::new()
            .post(format!("{}/webhook/order", base))
            .header(CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(fallback.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_webhook_unreachable_is_bad_gateway() {
        let (base, _) = spawn_app(vec![refused_url().await]).await;

        let resp = Client::new()
            .post(format!("{}/webhook/order", base))
            .header(CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(resp.json::<Value>().await.unwrap()["success"], json!(false));
    }

    #[tokio::test]
    async fn test_webhook_rejects_unknown_channel_and_bad_json() {
        let upstream = spawn_upstream(StatusCode::OK).await;
        let (base, _) = spawn_app(vec![upstream.url.clone()]).await;
        let client = Client::new();

        let resp = client
            .post(format!("{}/webhook/invoice", base))
            .body("{}")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = client
            .post(format!("{}/webhook/order", base))
            .body("plain text")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(upstream.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_acknowledges_upstream_error() {
        let upstream = spawn_upstream(StatusCode::INTERNAL_SERVER_ERROR).await;
        let (base, _) = spawn_app(vec![upstream.url.clone()]).await;

        let resp = Client::new()
            .post(format!("{}/api/orders", base))
            .json(&json!({ "item": "bolt" }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.json::<Value>().await.unwrap(),
            json!({
                "success": true,
                "message": "Order submitted successfully",
                "upstream_status": 500
            })
        );
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let (base, _) = spawn_app(vec![]).await;

        let resp = Client::new()
            .request(reqwest::Method::OPTIONS, format!("{}/webhook/order", base))
            .header("origin", "http://localhost:8080")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .send()
            .await
            .unwrap();

        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_unknown_path_not_found() {
        let (base, _) = spawn_app(vec![]).await;
        let resp = reqwest::get(format!("{}/nope", base)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.text().await.unwrap(), "Not found");
    }

    #[test]
    fn test_channel_for_collection() {
        assert_eq!(channel_for_collection("orders"), Some(Channel::Order));
        assert_eq!(channel_for_collection("quotations"), Some(Channel::Quotation));
        assert_eq!(channel_for_collection("reviews"), Some(Channel::Review));
        assert_eq!(channel_for_collection("order"), None);
        assert_eq!(channel_for_collection("invoices"), None);
    }
}
