//! Per-conversation workflow state.

use markoslav_core::Caption;

use crate::update::MessageId;

/// Label of a conversation with no active workflow.
pub const IDLE: &str = "";

/// Working memory of the active workflow.
///
/// Each workflow that needs memory gets its own variant, so a handler can
/// only ever see memory shaped the way it expects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WorkflowMemory {
    #[default]
    Empty,
    Review(ReviewSession),
}

/// A snapshot of pending captions being reviewed one at a time.
///
/// The snapshot is taken once when the session starts and is not refreshed,
/// so it can go stale if another reviewer decides on the same captions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSession {
    pub batch: Vec<Caption>,
    /// Index of the caption currently on display.
    pub cursor: usize,
    /// The message showing the review card.
    pub message_id: MessageId,
}

impl ReviewSession {
    pub fn new(batch: Vec<Caption>, message_id: MessageId) -> Self {
        Self {
            batch,
            cursor: 0,
            message_id,
        }
    }

    pub fn current(&self) -> Option<&Caption> {
        self.batch.get(self.cursor)
    }

    pub fn total(&self) -> usize {
        self.batch.len()
    }

    /// Captions left to decide, counting the current one.
    pub fn remaining(&self) -> usize {
        self.batch.len().saturating_sub(self.cursor)
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.batch.len()
    }

    pub fn advance(&mut self) {
        self.cursor += 1;
    }
}

/// Everything remembered about one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    /// Selects which workflow handlers are active. [`IDLE`] when none.
    pub label: String,
    pub memory: WorkflowMemory,
}

impl ConversationState {
    pub fn is_idle(&self) -> bool {
        self.label == IDLE
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn put_memory(&mut self, memory: WorkflowMemory) {
        self.memory = memory;
    }

    /// Reset label and memory together.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn review(&self) -> Option<&ReviewSession> {
        match &self.memory {
            WorkflowMemory::Review(session) => Some(session),
            WorkflowMemory::Empty => None,
        }
    }

    pub fn review_mut(&mut self) -> Option<&mut ReviewSession> {
        match &mut self.memory {
            WorkflowMemory::Review(session) => Some(session),
            WorkflowMemory::Empty => None,
        }
    }
}
