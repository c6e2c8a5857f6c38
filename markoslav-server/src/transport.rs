//! Outbound side of the messaging network.
//!
//! Workflows only ever talk to the network through [`Transport`], so tests can
//! swap in a recording fake.

use async_trait::async_trait;
use thiserror::Error;

use crate::update::{ChatId, FileRef, MessageId};

/// One inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    /// Payload delivered back in the resulting `ButtonPress`.
    pub data: String,
}

impl Button {
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// Inline keyboard attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    /// All callback payloads, row by row.
    pub fn data(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flatten()
            .map(|button| button.data.as_str())
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {description}")]
    Api { status: u16, description: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a new text message. Returns the id of the sent message.
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageId, TransportError>;

    /// Replace the text (and keyboard) of a message the bot sent earlier.
    /// Passing no keyboard removes the existing one.
    async fn edit_message(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError>;

    /// Send a PNG image, optionally as a reply.
    async fn send_photo(
        &self,
        chat: ChatId,
        png: Vec<u8>,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, TransportError>;

    /// Acknowledge a button press so the client stops showing a spinner.
    async fn answer_button(&self, callback_id: &str) -> Result<(), TransportError>;

    async fn download_file(&self, file: &FileRef) -> Result<Vec<u8>, TransportError>;
}
