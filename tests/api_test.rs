mod helpers;

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use chrono::Utc;
use http_body_util::BodyExt;
use tower::ServiceExt;

use helpers::stack::{StackOptions, TestStack};
use scribeline::application::ports::{BlobStore, JobRepository, QuotaRepository, UsageDelta};
use scribeline::application::services::JobStateMachine;
use scribeline::application::services::admission::{
    AbusePolicy, RateLimitPolicy, RateLimitRule, periods,
};
use scribeline::domain::{IdentityKey, JobId, Segment, StoragePath, TranscriptionResult};
use scribeline::presentation::config::ServerSettings;
use scribeline::presentation::{Settings, create_router};

const BROWSER_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0";

fn app(stack: &TestStack) -> Router {
    create_router(stack.app_state(Settings::default()))
}

fn admin_app(stack: &TestStack) -> Router {
    let settings = Settings {
        server: ServerSettings {
            admin_token: Some("s3cret".to_string()),
            ..ServerSettings::default()
        },
        ..Settings::default()
    };
    create_router(stack.app_state(settings))
}

fn submit(account: &str, tier: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/jobs")
        .header("content-type", "application/json")
        .header("x-identity-key", account)
        .header("x-identity-tier", tier)
        .header("user-agent", BROWSER_UA)
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn remote_job(url: &str) -> serde_json::Value {
    serde_json::json!({
        "source": {"kind": "remote_url", "reference": url},
        "estimated_minutes": 3
    })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn submitted_id(stack: &TestStack, account: &str) -> JobId {
    let response = app(stack)
        .oneshot(submit(
            account,
            "pro",
            remote_job("https://media.example/talk.mp3"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    serde_json::from_value(body["job_id"].clone()).unwrap()
}

#[tokio::test]
async fn given_running_server_when_health_check_then_returns_ok_with_request_id() {
    let stack = TestStack::new();

    let response = app(&stack)
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-123");
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["queued_jobs"], 0);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn given_valid_job_when_submitted_then_accepted_with_position_and_remaining_quota() {
    let stack = TestStack::new();

    let response = app(&stack)
        .oneshot(submit(
            "alice",
            "basic",
            remote_job("https://media.example/talk.mp3"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(response.headers().contains_key("x-request-id"));
    let body = body_json(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["position"], 1);
    assert_eq!(body["remaining"]["daily_requests"], 49);
    assert_eq!(body["remaining"]["monthly_minutes"], 297.0);
    assert!(body["job_id"].is_string());
}

#[tokio::test]
async fn given_non_http_url_when_submitted_then_bad_request() {
    let stack = TestStack::new();

    let response = app(&stack)
        .oneshot(submit("alice", "pro", remote_job("ftp://media.example/a.mp3")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("not an http(s) URL"));
}

#[tokio::test]
async fn given_unknown_tier_header_when_submitted_then_bad_request() {
    let stack = TestStack::new();

    let response = app(&stack)
        .oneshot(submit(
            "alice",
            "platinum",
            remote_job("https://media.example/talk.mp3"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_exhausted_free_minutes_when_submitted_then_payment_required_with_remaining() {
    let stack = TestStack::new();
    let identity = IdentityKey::Account("alice".to_string());
    let (day, month) = periods(Utc::now());
    stack
        .quota_repository
        .record(
            &identity,
            day,
            month,
            UsageDelta {
                requests: 0,
                minutes: 28.0,
                high_accuracy_minutes: 0.0,
            },
        )
        .await
        .unwrap();

    let response = app(&stack)
        .oneshot(submit(
            "alice",
            "free",
            remote_job("https://media.example/talk.mp3"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "quota exceeded");
    assert_eq!(body["exceeded"], "monthly_minutes");
    assert_eq!(body["remaining"]["monthly_minutes"], 2.0);
}

#[tokio::test]
async fn given_minute_limit_reached_when_submitted_then_too_many_requests_with_retry_after() {
    let stack = TestStack::with_options(StackOptions {
        rate: RateLimitPolicy {
            authenticated: RateLimitRule {
                per_minute: 1,
                per_day: 100,
            },
            ..RateLimitPolicy::default()
        },
        ..StackOptions::default()
    });
    let router = app(&stack);

    let first = router
        .clone()
        .oneshot(submit("alice", "pro", remote_job("https://media.example/a.mp3")))
        .await
        .unwrap();
    let second = router
        .oneshot(submit("alice", "pro", remote_job("https://media.example/b.mp3")))
        .await
        .unwrap();

    assert_eq!(first.status(), StatusCode::ACCEPTED);
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = second.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    let body = body_json(second).await;
    assert_eq!(body["scope"], "minute");
    assert_eq!(body["retry_after_secs"], retry_after);
}

fn bot_submit(account: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/jobs")
        .header("content-type", "application/json")
        .header("x-identity-key", account)
        .header("user-agent", "curl/8.5.0")
        .body(Body::from(
            remote_job("https://media.example/talk.mp3").to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn given_abusive_caller_when_blocked_then_forbidden_until_admin_reset() {
    let stack = TestStack::with_options(StackOptions {
        abuse: AbusePolicy {
            signal_cooldown_secs: 0,
            ..AbusePolicy::default()
        },
        ..StackOptions::default()
    });
    let router = admin_app(&stack);

    let first = router.clone().oneshot(bot_submit("mallory")).await.unwrap();
    let second = router.clone().oneshot(bot_submit("mallory")).await.unwrap();
    assert_eq!(first.status(), StatusCode::ACCEPTED);
    assert_eq!(second.status(), StatusCode::FORBIDDEN);

    let reset = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/admin/identities/acct:mallory/reset")
                .header("x-admin-token", "s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(reset.status(), StatusCode::OK);
    let body = body_json(reset).await;
    assert_eq!(body["identity"], "acct:mallory");
    assert_eq!(body["reset"], true);

    let after = router.oneshot(bot_submit("mallory")).await.unwrap();
    assert_eq!(after.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn given_wrong_admin_token_when_resetting_then_unauthorized() {
    let stack = TestStack::new();

    let response = admin_app(&stack)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/admin/identities/acct:mallory/reset")
                .header("x-admin-token", "guess")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn given_malformed_identity_key_when_resetting_then_bad_request() {
    let stack = TestStack::new();

    let response = app(&stack)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/admin/identities/alice/reset")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_submitted_job_when_status_requested_then_pending_with_progress() {
    let stack = TestStack::new();
    let job_id = submitted_id(&stack, "alice").await;

    let response = app(&stack)
        .oneshot(get(&format!("/api/v1/jobs/{}", job_id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["progress"], 5);
    assert_eq!(body["position"], 1);
}

#[tokio::test]
async fn given_bad_or_unknown_job_id_when_status_requested_then_400_or_404() {
    let stack = TestStack::new();

    let malformed = app(&stack)
        .oneshot(get("/api/v1/jobs/not-a-uuid"))
        .await
        .unwrap();
    let unknown = app(&stack)
        .oneshot(get(&format!("/api/v1/jobs/{}", JobId::new())))
        .await
        .unwrap();

    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

fn delete_as(job_id: JobId, account: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(format!("/api/v1/jobs/{}", job_id))
        .header("x-identity-key", account)
        .header("user-agent", BROWSER_UA)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn given_pending_job_when_cancelled_then_only_owner_succeeds_and_job_fails() {
    let stack = TestStack::new();
    let job_id = submitted_id(&stack, "alice").await;

    let intruder = app(&stack).oneshot(delete_as(job_id, "bob")).await.unwrap();
    assert_eq!(body_json(intruder).await["cancelled"], false);

    let owner = app(&stack).oneshot(delete_as(job_id, "alice")).await.unwrap();
    assert_eq!(owner.status(), StatusCode::OK);
    assert_eq!(body_json(owner).await["cancelled"], true);

    let status = app(&stack)
        .oneshot(get(&format!("/api/v1/jobs/{}", job_id)))
        .await
        .unwrap();
    let body = body_json(status).await;
    assert_eq!(body["status"], "failed");
    assert_eq!(body["error"], "cancelled");

    let transcript = app(&stack)
        .oneshot(get(&format!("/api/v1/jobs/{}/transcript", job_id)))
        .await
        .unwrap();
    assert_eq!(transcript.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn given_unfinished_job_when_transcript_requested_then_conflict() {
    let stack = TestStack::new();
    let job_id = submitted_id(&stack, "alice").await;

    let response = app(&stack)
        .oneshot(get(&format!("/api/v1/jobs/{}/transcript", job_id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn given_completed_job_when_transcript_requested_in_srt_then_rendered_on_demand() {
    let stack = TestStack::new();
    let job_id = submitted_id(&stack, "alice").await;
    let state = JobStateMachine::new(stack.repository.clone());
    for _ in 0..4 {
        state.advance(job_id).await.unwrap();
    }
    let result = TranscriptionResult {
        text: "Hello there.".to_string(),
        segments: vec![Segment::new(0.0, 1.5, "Hello there.")],
        language: Some("en".to_string()),
        ..TranscriptionResult::default()
    };
    stack
        .repository
        .save_result(job_id, "openai", &result)
        .await
        .unwrap();

    let srt = app(&stack)
        .oneshot(get(&format!("/api/v1/jobs/{}/transcript?format=srt", job_id)))
        .await
        .unwrap();
    let bad = app(&stack)
        .oneshot(get(&format!("/api/v1/jobs/{}/transcript?format=docx", job_id)))
        .await
        .unwrap();

    assert_eq!(srt.status(), StatusCode::OK);
    assert_eq!(srt.headers()["content-type"], "application/x-subrip");
    assert_eq!(
        body_text(srt).await,
        "1\n00:00:00,000 --> 00:00:01,500\nHello there.\n\n"
    );
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_multipart_file_when_uploaded_then_reference_is_usable_as_stored_file_source() {
    let stack = TestStack::new();
    let body = "--XyZ\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"my talk.wav\"\r\n\
        Content-Type: audio/wav\r\n\r\n\
        RIFF-uploaded-bytes\r\n\
        --XyZ--\r\n";

    let response = app(&stack)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/uploads")
                .header("content-type", "multipart/form-data; boundary=XyZ")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let reference = body_json(response).await["reference"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(reference.starts_with("uploads/"));
    assert!(reference.ends_with("/my_talk.wav"));
    let stored = stack
        .blob_store
        .fetch(&StoragePath::from_raw(reference.clone()))
        .await
        .unwrap();
    assert_eq!(stored, b"RIFF-uploaded-bytes");

    let submitted = app(&stack)
        .oneshot(submit(
            "alice",
            "pro",
            serde_json::json!({"source": {"kind": "stored_file", "reference": reference}}),
        ))
        .await
        .unwrap();
    assert_eq!(submitted.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn given_signed_url_when_blob_requested_then_served_and_tampering_is_rejected() {
    let stack = TestStack::new();
    let path = StoragePath::from_raw("audio/job-1/source.wav");
    stack
        .blob_store
        .put(&path, Bytes::from_static(b"RIFF-blob"))
        .await
        .unwrap();
    let signed = stack
        .blob_store
        .signer()
        .sign(&path, Duration::from_secs(600), Utc::now());
    let uri = signed.trim_start_matches("http://localhost:3000").to_string();

    let served = app(&stack).oneshot(get(&uri)).await.unwrap();
    let tampered = app(&stack)
        .oneshot(get(&uri.replace("source.wav", "other.wav")))
        .await
        .unwrap();
    let expired_uri = stack
        .blob_store
        .signer()
        .sign(&path, Duration::from_secs(1), Utc::now() - chrono::TimeDelta::hours(1));
    let expired = app(&stack)
        .oneshot(get(expired_uri.trim_start_matches("http://localhost:3000")))
        .await
        .unwrap();

    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(served.headers()["content-type"], "audio/wav");
    assert_eq!(body_text(served).await, "RIFF-blob");
    assert_eq!(tampered.status(), StatusCode::FORBIDDEN);
    assert_eq!(expired.status(), StatusCode::FORBIDDEN);
}
