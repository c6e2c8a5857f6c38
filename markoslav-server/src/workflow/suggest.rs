//! Suggest workflow: `""` -> `entering_caption` -> `""`.
//!
//! A duplicate submission keeps the conversation in `entering_caption` so the
//! user can try another text. Any other outcome ends the workflow.

use async_trait::async_trait;
use tracing::{error, info};

use markoslav_core::QueueError;

use super::replies;
use crate::conversation::ConversationState;
use crate::router::{Action, HandlerError, Services};
use crate::update::Update;

pub const ENTERING_CAPTION: &str = "entering_caption";

pub struct StartSuggestion;

#[async_trait]
impl Action for StartSuggestion {
    async fn run(
        &self,
        services: &Services,
        update: &Update,
        state: &mut ConversationState,
    ) -> Result<(), HandlerError> {
        services
            .transport
            .send_message(update.chat(), replies::SUGGEST_PROMPT, None)
            .await?;
        state.set_label(ENTERING_CAPTION);
        Ok(())
    }
}

pub struct EnterCaption;

#[async_trait]
impl Action for EnterCaption {
    async fn run(
        &self,
        services: &Services,
        update: &Update,
        state: &mut ConversationState,
    ) -> Result<(), HandlerError> {
        let Some(text) = update.message().and_then(|m| m.text.as_deref()) else {
            return Ok(());
        };

        // The state decision rests on the submission alone; a failed reply
        // below does not undo it.
        let reply = match services.queue.submit(text, update.sender()).await {
            Ok(caption) => {
                info!(key = %update.key, caption_id = %caption.id, "Caption suggested");
                state.clear();
                replies::SUGGEST_SUCCESS.to_string()
            }
            Err(QueueError::Duplicate) => replies::suggest_failed(replies::SUGGEST_DUPLICATE),
            Err(e) => {
                state.clear();
                return report_failed_submission(services, update, e.into()).await;
            }
        };

        services
            .transport
            .send_message(update.chat(), &reply, None)
            .await?;
        Ok(())
    }
}

/// Internal failures get the generic detail inside the suggest failure text.
async fn report_failed_submission(
    services: &Services,
    update: &Update,
    err: HandlerError,
) -> Result<(), HandlerError> {
    error!(key = %update.key, "Failed to submit caption: {}", err);
    services
        .transport
        .send_message(
            update.chat(),
            &replies::suggest_failed(replies::UNKNOWN_ERROR),
            None,
        )
        .await?;
    Ok(())
}

pub struct CancelSuggestion;

#[async_trait]
impl Action for CancelSuggestion {
    async fn run(
        &self,
        services: &Services,
        update: &Update,
        state: &mut ConversationState,
    ) -> Result<(), HandlerError> {
        state.clear();
        services
            .transport
            .send_message(update.chat(), replies::SUGGEST_CANCELLED, None)
            .await?;
        Ok(())
    }
}
