//! Inbound update model.
//!
//! Everything the router and the workflows need to know about one event from
//! the messaging network, independent of the wire format it arrived in.

use std::fmt;

use markoslav_core::UserId;

use crate::command::BotCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

/// Identifies one dialogue: a chat plus the user who started it.
///
/// Two members of the same group chat each get their own key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub chat: ChatId,
    pub user: UserId,
}

impl ConversationKey {
    pub fn new(chat: ChatId, user: UserId) -> Self {
        Self { chat, user }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.chat, self.user)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// One-to-one chat between the bot and a user.
    Private,
    /// Group, supergroup or channel.
    Group,
}

/// Reference to a file stored by the messaging network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IncomingMessage {
    pub id: Option<MessageId>,
    pub text: Option<String>,
    /// Caption attached to a photo.
    pub caption: Option<String>,
    /// Largest available size of an attached photo.
    pub photo: Option<FileRef>,
    pub reply_to: Option<Box<IncomingMessage>>,
}

impl IncomingMessage {
    /// Message text, falling back to the photo caption.
    pub fn body(&self) -> Option<&str> {
        self.caption
            .as_deref()
            .filter(|c| !c.is_empty())
            .or(self.text.as_deref())
    }

    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// A press on an inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonPress {
    pub callback_id: String,
    pub data: String,
    /// The message carrying the keyboard, if the network still knows it.
    pub message_id: Option<MessageId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    Command(BotCommand),
    Message(IncomingMessage),
    ButtonPress(ButtonPress),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub key: ConversationKey,
    pub chat_kind: ChatKind,
    pub kind: UpdateKind,
}

impl Update {
    pub fn sender(&self) -> UserId {
        self.key.user
    }

    pub fn chat(&self) -> ChatId {
        self.key.chat
    }

    pub fn is_private(&self) -> bool {
        self.chat_kind == ChatKind::Private
    }

    pub fn command(&self) -> Option<&BotCommand> {
        match &self.kind {
            UpdateKind::Command(command) => Some(command),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&IncomingMessage> {
        match &self.kind {
            UpdateKind::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn button(&self) -> Option<&ButtonPress> {
        match &self.kind {
            UpdateKind::ButtonPress(press) => Some(press),
            _ => None,
        }
    }

    /// Short name of the update kind, for logs.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            UpdateKind::Command(_) => "command",
            UpdateKind::Message(_) => "message",
            UpdateKind::ButtonPress(_) => "button",
        }
    }
}
