//! Conversation state: a label selecting the active workflow plus that
//! workflow's typed working memory, stored per chat and user.

pub mod state;
pub mod store;

pub use state::{ConversationState, ReviewSession, WorkflowMemory, IDLE};
pub use store::ConversationStore;
