pub mod command;
pub mod config;
pub mod conversation;
pub mod poller;
pub mod router;
pub mod scheduler;
pub mod status;
pub mod telegram;
pub mod transport;
pub mod update;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use config::{AdminList, Config};
pub use conversation::{ConversationState, ConversationStore};
pub use router::{Dispatch, Router, Services};
pub use scheduler::ConversationScheduler;
pub use telegram::TelegramClient;
pub use transport::Transport;
pub use update::Update;
