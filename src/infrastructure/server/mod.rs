//! Events API webhook server

pub mod signature;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn, Instrument};

use crate::application::errors::BotError;
use crate::application::messaging::EventDispatcher;
use crate::domain::entities::MessageEvent;
pub use signature::{SignatureError, SignatureVerifier};

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<EventDispatcher>,
    pub verifier: SignatureVerifier,
}

/// Outer payload of every Events API request
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Envelope {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        event: Value,
        #[serde(default)]
        event_id: Option<String>,
        #[serde(default)]
        event_time: i64,
    },
    #[serde(other)]
    Other,
}

/// Create the application router
pub fn create_router(state: AppState, endpoint: &str) -> Router {
    Router::new()
        .route(endpoint, post(slack_events))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn slack_events(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let now = chrono::Utc::now().timestamp();
    if let Err(e) = state.verifier.verify(
        header(&headers, "x-slack-request-timestamp"),
        header(&headers, "x-slack-signature"),
        &body,
        now,
    ) {
        warn!("Rejected Slack request: {}", e);
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let envelope: Envelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Unreadable Slack payload: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match envelope {
        Envelope::UrlVerification { challenge } => {
            info!("Answering Slack URL verification");
            Json(json!({ "challenge": challenge })).into_response()
        }
        Envelope::EventCallback { event, event_id, event_time } => {
            if let Some(retry) = header(&headers, "x-slack-retry-num") {
                debug!(retry = %retry, "Ignoring Slack retry of {:?}", event_id);
                return StatusCode::OK.into_response();
            }

            if event.get("type").and_then(Value::as_str) != Some("message") {
                debug!("Ignoring non-message event");
                return StatusCode::OK.into_response();
            }

            let message: MessageEvent = match serde_json::from_value(event) {
                Ok(message) => message,
                Err(e) => {
                    warn!("Bad message event {:?}: {}", event_id, e);
                    return StatusCode::OK.into_response();
                }
            };
            let message = message.with_event_time(event_time);
            let event_id = event_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let span = tracing::info_span!("event", id = %event_id);

            // Slack wants an answer within 3 seconds; replies happen in the background
            let dispatcher = state.dispatcher.clone();
            tokio::spawn(
                async move {
                    match dispatcher.dispatch(message).await {
                        Ok(outcome) => debug!("{:?}", outcome),
                        Err(e) => warn!("Failed to handle event: {}", e),
                    }
                }
                .instrument(span),
            );
            StatusCode::OK.into_response()
        }
        Envelope::Other => StatusCode::OK.into_response(),
    }
}

/// Bind and serve until `shutdown` resolves
pub async fn serve(
    addr: &str,
    endpoint: &str,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), BotError> {
    let app = create_router(state, endpoint);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| BotError::Server(format!("Failed to bind {}: {}", addr, e)))?;
    info!("Listening for Slack events on http://{}{}", addr, endpoint);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| BotError::Server(e.to_string()))
}
