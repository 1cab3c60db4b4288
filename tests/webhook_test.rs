//! Events API integration tests
//! Run with: cargo test --test webhook_test

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::json;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tower::ServiceExt;

use modbot::application::errors::PlatformError;
use modbot::build_dispatcher;
use modbot::domain::entities::{KeywordRule, KeywordsState, OutgoingMessage, User};
use modbot::domain::traits::{BotInfo, ChatPlatform, RuleStore};
use modbot::infrastructure::config::Config;
use modbot::infrastructure::server::{create_router, AppState, SignatureVerifier};
use modbot::infrastructure::storage::JsonRuleStore;

const SECRET: &str = "test-signing-secret";
const ENDPOINT: &str = "/slack/events";

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Platform that records what the bot sends
#[derive(Default)]
struct RecordingPlatform {
    sent: Mutex<Vec<OutgoingMessage>>,
}

impl RecordingPlatform {
    fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPlatform for RecordingPlatform {
    async fn identify(&self) -> Result<BotInfo, PlatformError> {
        Ok(BotInfo { user_id: "UBOT".into(), name: "modbot".into(), team: Some("T1".into()) })
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<Option<String>, PlatformError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(Some("1.0".into()))
    }

    async fn open_direct(&self, user_id: &str) -> Result<String, PlatformError> {
        Ok(format!("D{}", user_id))
    }

    async fn user_info(&self, user_id: &str) -> Result<User, PlatformError> {
        let user = User::new(user_id).with_display_name(format!("name-of-{}", user_id));
        Ok(if user_id == "UADMIN" { user.as_admin() } else { user })
    }
}

struct Harness {
    router: Router,
    platform: Arc<RecordingPlatform>,
    store_path: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

async fn harness() -> Harness {
    harness_with_channels(Vec::new()).await
}

async fn harness_with_channels(channels: Vec<String>) -> Harness {
    ensure_init();

    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("modbot_keywords.json");

    let mut state = KeywordsState::default();
    state.upsert(KeywordRule::text("python", "Please join #python").unwrap());
    state.upsert(KeywordRule::channels("design", vec!["<#C9|design>".to_string()]).unwrap());
    JsonRuleStore::new(&store_path).save(&state).await.unwrap();

    let mut config = Config::default();
    config.extensions.keywords.store_path = store_path.clone();
    config.extensions.keywords.channels = channels;

    let platform = Arc::new(RecordingPlatform::default());
    let dispatcher = build_dispatcher(&config, platform.clone())
        .await
        .unwrap()
        .with_start_time(0);

    let router = create_router(
        AppState {
            dispatcher: Arc::new(dispatcher),
            verifier: SignatureVerifier::new(SECRET),
        },
        ENDPOINT,
    );

    Harness { router, platform, store_path, _dir: dir }
}

fn signed_request(body: &serde_json::Value) -> Request<Body> {
    let body = body.to_string();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = SignatureVerifier::new(SECRET)
        .sign(&timestamp, body.as_bytes())
        .unwrap();

    Request::builder()
        .method("POST")
        .uri(ENDPOINT)
        .header("content-type", "application/json")
        .header("x-slack-request-timestamp", timestamp)
        .header("x-slack-signature", signature)
        .body(Body::from(body))
        .unwrap()
}

fn message_callback(user: &str, channel: &str, channel_type: &str, text: &str) -> serde_json::Value {
    let now = chrono::Utc::now().timestamp();
    json!({
        "type": "event_callback",
        "event_id": format!("Ev{}", now),
        "event_time": now,
        "event": {
            "type": "message",
            "user": user,
            "text": text,
            "channel": channel,
            "channel_type": channel_type,
            "ts": format!("{}.000100", now),
        }
    })
}

/// Wait until the background handler has sent `count` messages, then a little more
async fn wait_for_sent(platform: &RecordingPlatform, count: usize) -> Vec<OutgoingMessage> {
    for _ in 0..100 {
        if platform.sent().len() >= count {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    platform.sent()
}

#[tokio::test]
async fn test_url_verification() {
    let h = harness().await;
    let body = json!({ "type": "url_verification", "token": "t", "challenge": "abc123" });

    let response = h.router.clone().oneshot(signed_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let answer: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(answer["challenge"], "abc123");
}

#[tokio::test]
async fn test_unsigned_and_stale_requests_are_rejected() {
    let h = harness().await;
    let body = message_callback("U1", "C1", "channel", "python").to_string();

    let unsigned = Request::builder()
        .method("POST")
        .uri(ENDPOINT)
        .body(Body::from(body.clone()))
        .unwrap();
    let response = h.router.clone().oneshot(unsigned).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let old = (chrono::Utc::now().timestamp() - 600).to_string();
    let signature = SignatureVerifier::new(SECRET).sign(&old, body.as_bytes()).unwrap();
    let stale = Request::builder()
        .method("POST")
        .uri(ENDPOINT)
        .header("x-slack-request-timestamp", old)
        .header("x-slack-signature", signature)
        .body(Body::from(body))
        .unwrap();
    let response = h.router.clone().oneshot(stale).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert!(wait_for_sent(&h.platform, 1).await.is_empty());
}

#[tokio::test]
async fn test_keyword_gets_exactly_one_ephemeral_reply() {
    let h = harness().await;
    let body = message_callback("U1", "CGENERAL", "channel", "Hi! Any *Python* people around?");

    let response = h.router.clone().oneshot(signed_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let sent = wait_for_sent(&h.platform, 1).await;
    assert_eq!(
        sent,
        vec![OutgoingMessage::ephemeral("CGENERAL", "U1", "Please join #python")]
    );
}

#[tokio::test]
async fn test_template_keyword_reply() {
    let h = harness().await;
    let body = message_callback("U1", "CGENERAL", "channel", "I do design");

    h.router.clone().oneshot(signed_request(&body)).await.unwrap();

    let sent = wait_for_sent(&h.platform, 1).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("you can join <#C9|design>"));
}

#[tokio::test]
async fn test_no_keyword_no_reply() {
    let h = harness().await;
    let body = message_callback("U1", "CGENERAL", "channel", "Hello everyone, nice to be here");

    let response = h.router.clone().oneshot(signed_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(wait_for_sent(&h.platform, 1).await.is_empty());
}

#[tokio::test]
async fn test_retries_are_acknowledged_but_ignored() {
    let h = harness().await;
    let mut request = signed_request(&message_callback("U1", "C1", "channel", "python"));
    request.headers_mut().insert("x-slack-retry-num", "1".parse().unwrap());

    let response = h.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(wait_for_sent(&h.platform, 1).await.is_empty());
}

#[tokio::test]
async fn test_bot_own_messages_are_ignored() {
    let h = harness().await;
    let body = message_callback("UBOT", "C1", "channel", "Please join #python");

    h.router.clone().oneshot(signed_request(&body)).await.unwrap();
    assert!(wait_for_sent(&h.platform, 1).await.is_empty());
}

#[tokio::test]
async fn test_admin_adds_keyword_over_im() {
    let h = harness().await;

    let add = message_callback("UADMIN", "DADMIN", "im", "keyword add rust Come to #rust");
    h.router.clone().oneshot(signed_request(&add)).await.unwrap();
    let sent = wait_for_sent(&h.platform, 1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].channel, "DADMIN");

    let persisted = JsonRuleStore::new(&h.store_path).load().await.unwrap();
    assert!(persisted.find_rule("rust").is_some());

    let ask = message_callback("U1", "CGENERAL", "channel", "learning rust");
    h.router.clone().oneshot(signed_request(&ask)).await.unwrap();
    let sent = wait_for_sent(&h.platform, 2).await;
    assert_eq!(sent[1], OutgoingMessage::ephemeral("CGENERAL", "U1", "Come to #rust"));
}

#[tokio::test]
async fn test_channel_restricted_bot_is_configurable_over_im() {
    let h = harness_with_channels(vec!["CWELCOME".to_string()]).await;

    let add = message_callback("UADMIN", "DADMIN", "im", "keyword add rust see #rust");
    h.router.clone().oneshot(signed_request(&add)).await.unwrap();
    let sent = wait_for_sent(&h.platform, 1).await;
    assert_eq!(sent, vec![OutgoingMessage::regular("DADMIN", "Thanks! I'll reply to rust now")]);

    let elsewhere = message_callback("U1", "CRANDOM", "channel", "learning rust");
    h.router.clone().oneshot(signed_request(&elsewhere)).await.unwrap();
    assert_eq!(wait_for_sent(&h.platform, 2).await.len(), 1);

    let welcome = message_callback("U1", "CWELCOME", "channel", "learning rust");
    h.router.clone().oneshot(signed_request(&welcome)).await.unwrap();
    let sent = wait_for_sent(&h.platform, 2).await;
    assert_eq!(sent[1], OutgoingMessage::ephemeral("CWELCOME", "U1", "see #rust"));
}

#[tokio::test]
async fn test_health() {
    let h = harness().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let response = h.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}
