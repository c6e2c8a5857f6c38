//! Health and status endpoints.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::warn;

use markoslav_core::ModerationQueue;

use crate::conversation::ConversationStore;

pub struct StatusState {
    pub store: Arc<ConversationStore>,
    pub queue: ModerationQueue,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusData {
    pub version: &'static str,
    /// Conversations with a workflow in progress.
    pub active_conversations: usize,
    /// `None` when the database could not be queried.
    pub pending_captions: Option<usize>,
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "markoslav"
    }))
}

async fn status_handler(State(state): State<Arc<StatusState>>) -> Json<StatusData> {
    let pending_captions = match state.queue.pending_count().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!("Failed to count pending captions: {}", e);
            None
        }
    };

    Json(StatusData {
        version: env!("CARGO_PKG_VERSION"),
        active_conversations: state.store.active_count().await,
        pending_captions,
    })
}

pub fn status_router(state: Arc<StatusState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use markoslav_core::{InMemoryRepository, UserId};
    use tower::ServiceExt;

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let state = Arc::new(StatusState {
            store: Arc::new(ConversationStore::new()),
            queue: ModerationQueue::new(Arc::new(InMemoryRepository::new())),
        });
        let (status, body) = get_json(status_router(state), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_status_counts() {
        let queue = ModerationQueue::new(Arc::new(InMemoryRepository::new()));
        queue.submit("a", UserId(1)).await.unwrap();
        queue.submit("b", UserId(1)).await.unwrap();
        let store = Arc::new(ConversationStore::new());
        let key = crate::update::ConversationKey::new(crate::update::ChatId(1), UserId(1));
        store.set_label(key, "entering_caption").await;

        let state = Arc::new(StatusState { store, queue });
        let (status, body) = get_json(status_router(state), "/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active_conversations"], 1);
        assert_eq!(body["pending_captions"], 2);
    }
}
