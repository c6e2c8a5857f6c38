//! Fakes and update builders for workflow tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, RgbaImage};

use markoslav_core::{
    Caption, CaptionId, CaptionRenderer, CaptionRepository, FilterOptions, InMemoryRepository,
    ModerationQueue, RenderError, RepositoryError, UserId,
};

use crate::command::BotCommand;
use crate::router::Services;
use crate::transport::{Keyboard, Transport, TransportError};
use crate::update::{
    ButtonPress, ChatId, ChatKind, ConversationKey, FileRef, IncomingMessage, MessageId, Update,
    UpdateKind,
};

pub const GROUP_CHAT: i64 = -100;

/// One outbound call recorded by [`FakeTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Message {
        chat: ChatId,
        id: MessageId,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Edit {
        chat: ChatId,
        message: MessageId,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Photo {
        chat: ChatId,
        reply_to: Option<MessageId>,
        png: Vec<u8>,
    },
}

impl Sent {
    pub fn text(&self) -> Option<&str> {
        match self {
            Sent::Message { text, .. } | Sent::Edit { text, .. } => Some(text),
            Sent::Photo { .. } => None,
        }
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Sent::Message { keyboard, .. } | Sent::Edit { keyboard, .. } => keyboard.as_ref(),
            Sent::Photo { .. } => None,
        }
    }
}

#[derive(Default)]
pub struct FakeTransport {
    sent: Mutex<Vec<Sent>>,
    answered: Mutex<Vec<String>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    next_id: AtomicI64,
    failing: AtomicBool,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1000),
            ..Default::default()
        }
    }

    /// Make every outbound call fail from now on.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn add_file(&self, id: &str, bytes: Vec<u8>) {
        self.files.lock().unwrap().insert(id.to_string(), bytes);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Sent> {
        self.sent.lock().unwrap().last().cloned()
    }

    pub fn last_text(&self) -> Option<String> {
        self.last().and_then(|s| s.text().map(str::to_string))
    }

    pub fn answered(&self) -> Vec<String> {
        self.answered.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Api {
                status: 502,
                description: "fake outage".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageId, TransportError> {
        self.check()?;
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sent.lock().unwrap().push(Sent::Message {
            chat,
            id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(id)
    }

    async fn edit_message(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError> {
        self.check()?;
        self.sent.lock().unwrap().push(Sent::Edit {
            chat,
            message,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        png: Vec<u8>,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, TransportError> {
        self.check()?;
        self.sent.lock().unwrap().push(Sent::Photo {
            chat,
            reply_to,
            png,
        });
        Ok(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn answer_button(&self, callback_id: &str) -> Result<(), TransportError> {
        self.answered.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }

    async fn download_file(&self, file: &FileRef) -> Result<Vec<u8>, TransportError> {
        self.check()?;
        self.files
            .lock()
            .unwrap()
            .get(&file.0)
            .cloned()
            .ok_or_else(|| TransportError::Api {
                status: 404,
                description: format!("no file {}", file.0),
            })
    }
}

/// Renderer that returns the picture untouched and remembers the captions.
#[derive(Default)]
pub struct FakeRenderer {
    rendered: Mutex<Vec<String>>,
}

impl FakeRenderer {
    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }
}

impl CaptionRenderer for FakeRenderer {
    fn render(&self, image: &DynamicImage, text: &str) -> Result<RgbaImage, RenderError> {
        self.rendered.lock().unwrap().push(text.to_string());
        Ok(image.to_rgba8())
    }
}

pub fn services() -> (Services, Arc<FakeTransport>, Arc<FakeRenderer>) {
    let transport = Arc::new(FakeTransport::new());
    let renderer = Arc::new(FakeRenderer::default());
    let services = Services {
        queue: ModerationQueue::new(Arc::new(InMemoryRepository::new())),
        transport: transport.clone(),
        renderer: renderer.clone(),
    };
    (services, transport, renderer)
}

/// In-memory repository that can be switched into failing every call.
#[derive(Default)]
pub struct BreakableRepository {
    inner: InMemoryRepository,
    broken: AtomicBool,
}

impl BreakableRepository {
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }

    fn check(&self, operation: &'static str) -> Result<(), RepositoryError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(RepositoryError::storage(operation, "disk on fire"));
        }
        Ok(())
    }
}

#[async_trait]
impl CaptionRepository for BreakableRepository {
    async fn insert(&self, caption: &Caption) -> Result<(), RepositoryError> {
        self.check("insert")?;
        self.inner.insert(caption).await
    }
    async fn exists_by_text(&self, text: &str) -> Result<bool, RepositoryError> {
        self.check("exists_by_text")?;
        self.inner.exists_by_text(text).await
    }
    async fn get(&self, id: CaptionId) -> Result<Option<Caption>, RepositoryError> {
        self.check("get")?;
        self.inner.get(id).await
    }
    async fn select(
        &self,
        limit: usize,
        offset: usize,
        filter: &FilterOptions,
    ) -> Result<Vec<Caption>, RepositoryError> {
        self.check("select")?;
        self.inner.select(limit, offset, filter).await
    }
    async fn update(&self, caption: &Caption) -> Result<bool, RepositoryError> {
        self.check("update")?;
        self.inner.update(caption).await
    }
    async fn delete(&self, id: CaptionId) -> Result<bool, RepositoryError> {
        self.check("delete")?;
        self.inner.delete(id).await
    }
    async fn random(&self, filter: &FilterOptions) -> Result<Option<Caption>, RepositoryError> {
        self.check("random")?;
        self.inner.random(filter).await
    }
    async fn count(&self, filter: &FilterOptions) -> Result<usize, RepositoryError> {
        self.check("count")?;
        self.inner.count(filter).await
    }
}

/// A tiny valid PNG.
pub fn png_bytes() -> Vec<u8> {
    let image = RgbaImage::from_pixel(4, 4, image::Rgba([200, 100, 50, 255]));
    markoslav_core::encode_png(&image).unwrap()
}

fn key(kind: ChatKind, user: i64) -> ConversationKey {
    let chat = match kind {
        ChatKind::Private => user,
        ChatKind::Group => GROUP_CHAT,
    };
    ConversationKey::new(ChatId(chat), UserId(user))
}

pub fn command(kind: ChatKind, user: i64, command: BotCommand) -> Update {
    Update {
        key: key(kind, user),
        chat_kind: kind,
        kind: UpdateKind::Command(command),
    }
}

pub fn message(kind: ChatKind, user: i64, message: IncomingMessage) -> Update {
    Update {
        key: key(kind, user),
        chat_kind: kind,
        kind: UpdateKind::Message(message),
    }
}

pub fn text(kind: ChatKind, user: i64, text: &str) -> Update {
    message(
        kind,
        user,
        IncomingMessage {
            id: Some(MessageId(1)),
            text: Some(text.to_string()),
            ..Default::default()
        },
    )
}

/// A photo message with an optional caption.
pub fn photo(caption: Option<&str>, file: &str) -> IncomingMessage {
    IncomingMessage {
        id: Some(MessageId(2)),
        caption: caption.map(str::to_string),
        photo: Some(FileRef(file.to_string())),
        ..Default::default()
    }
}

/// Button press in the user's private chat.
pub fn button(user: i64, data: &str, message_id: i64) -> Update {
    Update {
        key: key(ChatKind::Private, user),
        chat_kind: ChatKind::Private,
        kind: UpdateKind::ButtonPress(ButtonPress {
            callback_id: format!("cb-{data}"),
            data: data.to_string(),
            message_id: Some(MessageId(message_id)),
        }),
    }
}
