//! In-memory store of conversation state.
//!
//! State is ephemeral: nothing survives a restart, and a conversation that is
//! never cancelled or completed keeps its state until then.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::state::{ConversationState, WorkflowMemory};
use crate::update::ConversationKey;

/// Thread-safe store keyed by conversation.
///
/// Idle conversations are not stored, so [`ConversationStore::active_count`]
/// is the number of conversations with a workflow in progress.
pub struct ConversationStore {
    states: RwLock<HashMap<ConversationKey, ConversationState>>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Current state, or the idle default if the key has never been used.
    pub async fn get(&self, key: &ConversationKey) -> ConversationState {
        let states = self.states.read().await;
        states.get(key).cloned().unwrap_or_default()
    }

    /// Replace the whole state. Storing the idle default removes the entry.
    pub async fn set(&self, key: ConversationKey, state: ConversationState) {
        let mut states = self.states.write().await;
        if state == ConversationState::default() {
            states.remove(&key);
        } else {
            states.insert(key, state);
        }
    }

    pub async fn set_label(&self, key: ConversationKey, label: impl Into<String>) {
        let mut state = self.get(&key).await;
        state.set_label(label);
        self.set(key, state).await;
    }

    pub async fn put_memory(&self, key: ConversationKey, memory: WorkflowMemory) {
        let mut state = self.get(&key).await;
        state.put_memory(memory);
        self.set(key, state).await;
    }

    pub async fn clear(&self, key: &ConversationKey) {
        let mut states = self.states.write().await;
        states.remove(key);
    }

    pub async fn active_count(&self) -> usize {
        let states = self.states.read().await;
        states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::state::ReviewSession;
    use crate::update::{ChatId, MessageId};
    use markoslav_core::UserId;

    fn key(chat: i64, user: i64) -> ConversationKey {
        ConversationKey::new(ChatId(chat), UserId(user))
    }

    #[tokio::test]
    async fn test_unknown_key_is_idle() {
        let store = ConversationStore::new();
        let state = store.get(&key(1, 1)).await;
        assert!(state.is_idle());
        assert_eq!(state.memory, WorkflowMemory::Empty);
    }

    #[tokio::test]
    async fn test_label_and_memory_are_independent() {
        let store = ConversationStore::new();
        let k = key(1, 1);
        let session = ReviewSession::new(Vec::new(), MessageId(3));

        store.set_label(k, "approving_captions").await;
        store
            .put_memory(k, WorkflowMemory::Review(session.clone()))
            .await;

        let state = store.get(&k).await;
        assert_eq!(state.label, "approving_captions");
        assert_eq!(state.review(), Some(&session));
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let store = ConversationStore::new();
        let k = key(1, 1);
        store.set_label(k, "entering_caption").await;

        store.clear(&k).await;
        assert_eq!(store.get(&k).await, ConversationState::default());
        assert_eq!(store.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_keys_are_scoped_to_chat_and_user() {
        let store = ConversationStore::new();
        store.set_label(key(1, 1), "entering_caption").await;

        assert!(store.get(&key(1, 2)).await.is_idle());
        assert!(store.get(&key(2, 1)).await.is_idle());
        assert_eq!(store.active_count().await, 1);
    }

    #[tokio::test]
    async fn test_setting_idle_state_removes_entry() {
        let store = ConversationStore::new();
        let k = key(1, 1);
        store.set_label(k, "entering_caption").await;
        store.set(k, ConversationState::default()).await;
        assert_eq!(store.active_count().await, 0);
    }
}
