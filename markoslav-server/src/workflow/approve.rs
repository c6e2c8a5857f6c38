//! Approve workflow: `""` -> `approving_captions` -> `""`.
//!
//! An administrator pages through a snapshot of pending captions, one review
//! card at a time, deciding each with inline buttons. The card is edited in
//! place after every decision.

use async_trait::async_trait;
use chrono::SecondsFormat;
use tracing::info;

use markoslav_core::{Caption, CaptionId};

use super::{replies, report_internal, APPROVE_BUTTON, CANCEL_BUTTON, REJECT_BUTTON};
use crate::conversation::{ConversationState, ReviewSession, WorkflowMemory};
use crate::router::{Action, HandlerError, Services};
use crate::transport::{Button, Keyboard};
use crate::update::Update;

pub const APPROVING_CAPTIONS: &str = "approving_captions";

/// What the review message should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewView {
    Card { text: String, keyboard: Keyboard },
    Finished { text: String },
}

fn review_keyboard() -> Keyboard {
    Keyboard::new(vec![
        vec![
            Button::new(replies::BUTTON_APPROVE, APPROVE_BUTTON),
            Button::new(replies::BUTTON_REJECT, REJECT_BUTTON),
        ],
        vec![Button::new(replies::BUTTON_CANCEL, CANCEL_BUTTON)],
    ])
}

/// Render the review message for position `cursor` of `batch`.
pub fn render_review(batch: &[Caption], cursor: usize) -> ReviewView {
    let Some(caption) = batch.get(cursor) else {
        return ReviewView::Finished {
            text: replies::APPROVE_FINISHED.to_string(),
        };
    };

    let text = format!(
        "\nПодписей осталось: {} / {}\n\ntext: {}\nauthor_id: {}\ncreated_at: {}\n",
        batch.len() - cursor,
        batch.len(),
        caption.text,
        caption.author_id,
        caption.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    ReviewView::Card {
        text,
        keyboard: review_keyboard(),
    }
}

pub struct StartReview {
    pub page_size: usize,
}

#[async_trait]
impl Action for StartReview {
    async fn run(
        &self,
        services: &Services,
        update: &Update,
        state: &mut ConversationState,
    ) -> Result<(), HandlerError> {
        let batch = match services.queue.list_pending(self.page_size, 0).await {
            Ok(batch) => batch,
            Err(e) => return report_internal(services, update.chat(), "approve_command", e.into()).await,
        };

        if batch.is_empty() {
            services
                .transport
                .send_message(update.chat(), replies::APPROVE_EMPTY, None)
                .await?;
            return Ok(());
        }

        let ReviewView::Card { text, keyboard } = render_review(&batch, 0) else {
            return Ok(());
        };
        let message_id = services
            .transport
            .send_message(update.chat(), &text, Some(&keyboard))
            .await?;

        info!(key = %update.key, count = batch.len(), "Review session started");
        state.put_memory(WorkflowMemory::Review(ReviewSession::new(batch, message_id)));
        state.set_label(APPROVING_CAPTIONS);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    async fn apply(self, services: &Services, id: CaptionId) -> Result<(), HandlerError> {
        match self {
            Decision::Approve => services.queue.approve(id).await?,
            Decision::Reject => services.queue.reject(id).await?,
        }
        Ok(())
    }
}

/// Apply a decision to the caption on display and move to the next one.
pub struct Decide(pub Decision);

#[async_trait]
impl Action for Decide {
    async fn run(
        &self,
        services: &Services,
        update: &Update,
        state: &mut ConversationState,
    ) -> Result<(), HandlerError> {
        let Some(session) = state.review_mut() else {
            state.clear();
            return Err(HandlerError::MissingSession(update.key));
        };
        let message_id = update
            .button()
            .and_then(|press| press.message_id)
            .unwrap_or(session.message_id);

        if let Some(caption) = session.current() {
            let id = caption.id;
            match self.0.apply(services, id).await {
                Ok(()) => info!(key = %update.key, caption_id = %id, decision = ?self.0, "Caption decided"),
                // Already decided elsewhere; stay on this card.
                Err(e) if e.is_not_found() => return Err(e),
                Err(e) => {
                    return report_internal(services, update.chat(), "review_decision", e).await;
                }
            }
            session.advance();
        }

        match render_review(&session.batch, session.cursor) {
            ReviewView::Card { text, keyboard } => {
                services
                    .transport
                    .edit_message(update.chat(), message_id, &text, Some(&keyboard))
                    .await?;
            }
            ReviewView::Finished { text } => {
                state.clear();
                services
                    .transport
                    .edit_message(update.chat(), message_id, &text, None)
                    .await?;
            }
        }
        Ok(())
    }
}

/// End a review session, from the card's button or from `/cancel`.
pub struct CancelReview;

#[async_trait]
impl Action for CancelReview {
    async fn run(
        &self,
        services: &Services,
        update: &Update,
        state: &mut ConversationState,
    ) -> Result<(), HandlerError> {
        let message_id = update
            .button()
            .and_then(|press| press.message_id)
            .or_else(|| state.review().map(|session| session.message_id));
        state.clear();

        match message_id {
            Some(message_id) => {
                services
                    .transport
                    .edit_message(update.chat(), message_id, replies::APPROVE_CANCELLED, None)
                    .await?;
            }
            None => {
                services
                    .transport
                    .send_message(update.chat(), replies::APPROVE_CANCELLED, None)
                    .await?;
            }
        }
        Ok(())
    }
}
