//! Dispatch router.
//!
//! Holds an ordered list of handlers. For each update the router loads the
//! conversation's state, then walks the handlers that are active for the
//! state's label in registration order and runs the first one whose filter
//! accepts the update. Registration order is priority order.
//!
//! Handler failures never escape: they are logged and the update counts as
//! handled. Whatever the action did to the conversation state before failing
//! is kept.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, error, warn};

use markoslav_core::{CaptionRenderer, ModerationQueue, QueueError, RenderError};

use crate::command::BotCommand;
use crate::config::AdminList;
use crate::conversation::{ConversationState, ConversationStore};
use crate::transport::{Transport, TransportError};
use crate::update::{ConversationKey, Update};

/// Collaborators available to every action.
#[derive(Clone)]
pub struct Services {
    pub queue: ModerationQueue,
    pub transport: Arc<dyn Transport>,
    pub renderer: Arc<dyn CaptionRenderer>,
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("render: {0}")]
    Render(#[from] RenderError),

    #[error("background task failed: {0}")]
    Task(#[from] JoinError),

    #[error("conversation {0} has no review session")]
    MissingSession(ConversationKey),
}

impl HandlerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, HandlerError::Queue(e) if e.is_not_found())
    }
}

/// Which conversation states a handler is active in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Regardless of state.
    Always,
    /// Only while the conversation label equals this one.
    State(&'static str),
}

impl Scope {
    pub fn admits(&self, label: &str) -> bool {
        match self {
            Scope::Always => true,
            Scope::State(expected) => *expected == label,
        }
    }
}

/// Predicate over an update.
#[derive(Clone)]
pub enum Filter {
    Any,
    /// One-to-one chat with the bot.
    Private,
    /// Sender is on the list.
    Admin(AdminList),
    Command(BotCommand),
    /// A non-command message with non-empty text.
    HasText,
    /// A button press carrying exactly this payload.
    Button(&'static str),
    All(Vec<Filter>),
    Custom(Arc<dyn Fn(&Update) -> bool + Send + Sync>),
}

impl Filter {
    pub fn custom(f: impl Fn(&Update) -> bool + Send + Sync + 'static) -> Self {
        Filter::Custom(Arc::new(f))
    }

    pub fn matches(&self, update: &Update) -> bool {
        match self {
            Filter::Any => true,
            Filter::Private => update.is_private(),
            Filter::Admin(admins) => admins.contains(update.sender()),
            Filter::Command(expected) => update.command() == Some(expected),
            Filter::HasText => update.message().is_some_and(|m| m.has_text()),
            Filter::Button(data) => update.button().is_some_and(|b| b.data == *data),
            Filter::All(filters) => filters.iter().all(|f| f.matches(update)),
            Filter::Custom(f) => f(update),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Any => write!(f, "Any"),
            Filter::Private => write!(f, "Private"),
            Filter::Admin(admins) => write!(f, "Admin({} users)", admins.len()),
            Filter::Command(command) => write!(f, "Command({command})"),
            Filter::HasText => write!(f, "HasText"),
            Filter::Button(data) => write!(f, "Button({data})"),
            Filter::All(filters) => f.debug_list().entries(filters).finish(),
            Filter::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// The body of a handler.
#[async_trait]
pub trait Action: Send + Sync {
    async fn run(
        &self,
        services: &Services,
        update: &Update,
        state: &mut ConversationState,
    ) -> Result<(), HandlerError>;
}

pub struct HandlerSpec {
    pub name: &'static str,
    pub scope: Scope,
    pub filter: Filter,
    pub action: Arc<dyn Action>,
}

impl HandlerSpec {
    pub fn new(
        name: &'static str,
        scope: Scope,
        filter: Filter,
        action: impl Action + 'static,
    ) -> Self {
        Self {
            name,
            scope,
            filter,
            action: Arc::new(action),
        }
    }
}

/// What happened to a dispatched update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// This handler ran (successfully or not).
    Handled(&'static str),
    /// No handler matched; the update was dropped.
    Unmatched,
}

pub struct Router {
    handlers: Vec<HandlerSpec>,
    store: Arc<ConversationStore>,
    services: Services,
}

impl Router {
    pub fn new(store: Arc<ConversationStore>, services: Services) -> Self {
        Self {
            handlers: Vec::new(),
            store,
            services,
        }
    }

    /// Append a handler. Earlier registrations win.
    pub fn register(&mut self, spec: HandlerSpec) -> &mut Self {
        self.handlers.push(spec);
        self
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name).collect()
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub async fn dispatch(&self, update: &Update) -> Dispatch {
        let mut state = self.store.get(&update.key).await;

        let Some(handler) = self
            .handlers
            .iter()
            .find(|h| h.scope.admits(&state.label) && h.filter.matches(update))
        else {
            debug!(key = %update.key, kind = update.kind_name(), label = %state.label, "No handler matched");
            self.acknowledge(update).await;
            return Dispatch::Unmatched;
        };

        debug!(key = %update.key, handler = handler.name, "Dispatching update");
        let result = handler.action.run(&self.services, update, &mut state).await;
        self.store.set(update.key, state).await;

        match result {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                warn!(key = %update.key, handler = handler.name, "Handler gave up: {}", e);
            }
            Err(e) => {
                error!(key = %update.key, handler = handler.name, "Handler failed: {}", e);
            }
        }

        self.acknowledge(update).await;
        Dispatch::Handled(handler.name)
    }

    /// Clear the client-side spinner of a button press.
    async fn acknowledge(&self, update: &Update) {
        if let Some(press) = update.button() {
            if let Err(e) = self.services.transport.answer_button(&press.callback_id).await {
                warn!(key = %update.key, "Failed to answer button press: {}", e);
            }
        }
    }
}
