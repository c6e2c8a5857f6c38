//! Bot workflows and the order they are registered in.
//!
//! Order matters: the router runs the first matching handler. State-scoped
//! handlers are registered first, then the always-active ones as a fallback,
//! with the random caption handler last since it would otherwise swallow
//! plain messages.

pub mod approve;
pub mod general;
pub mod replies;
pub mod suggest;

use std::sync::Arc;

use tracing::error;

use crate::command::BotCommand;
use crate::config::AdminList;
use crate::conversation::{ConversationStore, IDLE};
use crate::router::{Filter, HandlerError, HandlerSpec, Router, Scope, Services};
use crate::update::ChatId;

pub use approve::{render_review, ReviewView, APPROVING_CAPTIONS};
pub use suggest::ENTERING_CAPTION;

/// Button payloads of the review card.
pub const APPROVE_BUTTON: &str = "approve_caption";
pub const REJECT_BUTTON: &str = "reject_caption";
pub const CANCEL_BUTTON: &str = "cancel";

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub admins: AdminList,
    pub page_size: usize,
    pub random_reply_percent: u8,
}

/// Build the router with every handler in priority order.
///
/// Handlers scoped to a conversation label win over the always-active
/// ones, so `/start` and `/help` only answer when no workflow claims the
/// update.
pub fn build_router(
    store: Arc<ConversationStore>,
    services: Services,
    settings: WorkflowSettings,
) -> Router {
    let mut router = Router::new(store, services);
    router
        // Approve workflow
        .register(HandlerSpec::new(
            "approve_command",
            Scope::State(IDLE),
            Filter::All(vec![
                Filter::Command(BotCommand::Approve),
                Filter::Private,
                Filter::Admin(settings.admins.clone()),
            ]),
            approve::StartReview {
                page_size: settings.page_size,
            },
        ))
        .register(HandlerSpec::new(
            "approve_caption",
            Scope::State(APPROVING_CAPTIONS),
            Filter::Button(APPROVE_BUTTON),
            approve::Decide(approve::Decision::Approve),
        ))
        .register(HandlerSpec::new(
            "reject_caption",
            Scope::State(APPROVING_CAPTIONS),
            Filter::Button(REJECT_BUTTON),
            approve::Decide(approve::Decision::Reject),
        ))
        .register(HandlerSpec::new(
            "approve_cancel_button",
            Scope::State(APPROVING_CAPTIONS),
            Filter::Button(CANCEL_BUTTON),
            approve::CancelReview,
        ))
        .register(HandlerSpec::new(
            "approve_cancel_command",
            Scope::State(APPROVING_CAPTIONS),
            Filter::Command(BotCommand::Cancel),
            approve::CancelReview,
        ))
        // Suggest workflow
        .register(HandlerSpec::new(
            "suggest_command",
            Scope::State(IDLE),
            Filter::All(vec![Filter::Command(BotCommand::Suggest), Filter::Private]),
            suggest::StartSuggestion,
        ))
        .register(HandlerSpec::new(
            "enter_caption",
            Scope::State(ENTERING_CAPTION),
            Filter::HasText,
            suggest::EnterCaption,
        ))
        .register(HandlerSpec::new(
            "suggest_cancel",
            Scope::State(ENTERING_CAPTION),
            Filter::Command(BotCommand::Cancel),
            suggest::CancelSuggestion,
        ))
        // Always active
        .register(HandlerSpec::new(
            "start",
            Scope::Always,
            Filter::Command(BotCommand::Start),
            general::Help,
        ))
        .register(HandlerSpec::new(
            "help",
            Scope::Always,
            Filter::Command(BotCommand::Help),
            general::Help,
        ))
        .register(HandlerSpec::new(
            "random_caption",
            Scope::Always,
            general::random_trigger(settings.random_reply_percent),
            general::RandomCaption,
        ));
    router
}

/// Log an internal failure and tell the user something went wrong.
async fn report_internal(
    services: &Services,
    chat: ChatId,
    handler: &str,
    err: HandlerError,
) -> Result<(), HandlerError> {
    error!(chat = %chat, handler, "Internal error: {}", err);
    services
        .transport
        .send_message(chat, replies::UNKNOWN_ERROR, None)
        .await?;
    Ok(())
}
