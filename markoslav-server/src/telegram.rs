//! Telegram Bot API client.
//!
//! Implements [`Transport`] over HTTPS and converts raw API updates into the
//! network-independent [`Update`] model.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use markoslav_core::UserId;

use crate::command::{parse_command, ParseResult};
use crate::transport::{Keyboard, Transport, TransportError};
use crate::update::{
    ButtonPress, ChatId, ChatKind, ConversationKey, FileRef, IncomingMessage, MessageId, Update,
    UpdateKind,
};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUpdate {
    pub update_id: i64,
    pub message: Option<TgMessage>,
    pub callback_query: Option<TgCallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgMessage {
    pub message_id: i64,
    pub from: Option<TgUser>,
    pub chat: TgChat,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub photo: Option<Vec<TgPhotoSize>>,
    pub reply_to_message: Option<Box<TgMessage>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgPhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgCallbackQuery {
    pub id: String,
    pub from: TgUser,
    pub message: Option<TgMessage>,
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgFile {
    file_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct InlineButton<'a> {
    text: &'a str,
    callback_data: &'a str,
}

fn reply_markup(keyboard: &Keyboard) -> serde_json::Value {
    let rows: Vec<Vec<InlineButton<'_>>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| InlineButton {
                    text: &button.text,
                    callback_data: &button.data,
                })
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

impl TgMessage {
    fn to_incoming(&self) -> IncomingMessage {
        IncomingMessage {
            id: Some(MessageId(self.message_id)),
            text: self.text.clone(),
            caption: self.caption.clone(),
            // Sizes are listed smallest first.
            photo: self
                .photo
                .as_ref()
                .and_then(|sizes| sizes.last())
                .map(|size| FileRef(size.file_id.clone())),
            reply_to: self
                .reply_to_message
                .as_ref()
                .map(|reply| Box::new(reply.to_incoming())),
        }
    }
}

fn chat_kind(chat: &TgChat) -> ChatKind {
    if chat.kind == "private" {
        ChatKind::Private
    } else {
        ChatKind::Group
    }
}

/// Convert a raw API update.
///
/// Returns `None` for update types the bot does not handle and for updates
/// that cannot be attributed to a chat and a user.
pub fn to_update(raw: &TgUpdate) -> Option<Update> {
    if let Some(message) = &raw.message {
        let user = message.from.as_ref()?;
        let key = ConversationKey::new(ChatId(message.chat.id), UserId(user.id));
        let kind = match message.text.as_deref().map(parse_command) {
            Some(ParseResult::Command(command)) => UpdateKind::Command(command),
            _ => UpdateKind::Message(message.to_incoming()),
        };
        return Some(Update {
            key,
            chat_kind: chat_kind(&message.chat),
            kind,
        });
    }

    if let Some(query) = &raw.callback_query {
        let message = query.message.as_ref()?;
        let key = ConversationKey::new(ChatId(message.chat.id), UserId(query.from.id));
        return Some(Update {
            key,
            chat_kind: chat_kind(&message.chat),
            kind: UpdateKind::ButtonPress(ButtonPress {
                callback_id: query.id.clone(),
                data: query.data.clone().unwrap_or_default(),
                message_id: Some(MessageId(message.message_id)),
            }),
        });
    }

    None
}

#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, token, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Every call gives up after `timeout`, except long polls which set
    /// their own.
    pub fn with_timeout(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn parse<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        let body = response.text().await?;

        let parsed: ApiResponse<T> = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => {
                return Err(TransportError::Decode(format!("{method}: {e}")));
            }
            Err(_) => {
                return Err(TransportError::Api {
                    status: status.as_u16(),
                    description: body,
                });
            }
        };

        if !parsed.ok {
            let description = parsed.description.unwrap_or_default();
            error!("Telegram API error in {}: {} - {}", method, status, description);
            return Err(TransportError::Api {
                status: status.as_u16(),
                description,
            });
        }

        parsed
            .result
            .ok_or_else(|| TransportError::Decode(format!("{method}: missing result")))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, TransportError> {
        debug!("Calling Telegram method {}", method);
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?;
        Self::parse(method, response).await
    }

    /// Username of the bot account, used to check the token at startup.
    pub async fn get_me(&self) -> Result<String, TransportError> {
        let me: TgUser = self.call("getMe", &json!({})).await?;
        Ok(me.username.unwrap_or_default())
    }

    /// Long-poll for updates with ids at or above `offset`.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<TgUpdate>, TransportError> {
        let mut body = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }

        let response = self
            .client
            .post(self.method_url("getUpdates"))
            .timeout(Duration::from_secs(timeout_secs + 10))
            .json(&body)
            .send()
            .await?;
        Self::parse("getUpdates", response).await
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageId, TransportError> {
        let mut body = json!({ "chat_id": chat.0, "text": text });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = reply_markup(keyboard);
        }
        let sent: TgMessage = self.call("sendMessage", &body).await?;
        Ok(MessageId(sent.message_id))
    }

    async fn edit_message(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError> {
        let mut body = json!({
            "chat_id": chat.0,
            "message_id": message.0,
            "text": text,
        });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = reply_markup(keyboard);
        }
        // Returns the edited message, or `true` for inline messages.
        let _: serde_json::Value = self.call("editMessageText", &body).await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        png: Vec<u8>,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, TransportError> {
        let mut form = Form::new().text("chat_id", chat.0.to_string()).part(
            "photo",
            Part::bytes(png)
                .file_name("picture.png")
                .mime_str("image/png")?,
        );
        if let Some(reply_to) = reply_to {
            form = form.text("reply_to_message_id", reply_to.0.to_string());
        }

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;
        let sent: TgMessage = Self::parse("sendPhoto", response).await?;
        Ok(MessageId(sent.message_id))
    }

    async fn answer_button(&self, callback_id: &str) -> Result<(), TransportError> {
        let _: bool = self
            .call("answerCallbackQuery", &json!({ "callback_query_id": callback_id }))
            .await?;
        Ok(())
    }

    async fn download_file(&self, file: &FileRef) -> Result<Vec<u8>, TransportError> {
        let info: TgFile = self.call("getFile", &json!({ "file_id": file.0 })).await?;
        let path = info
            .file_path
            .ok_or_else(|| TransportError::Decode(format!("file {} has no path", file.0)))?;

        let url = format!("{}/file/bot{}/{}", self.base_url, self.token, path);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Api {
                status: status.as_u16(),
                description: format!("downloading {}", file.0),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
