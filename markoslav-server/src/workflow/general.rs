//! Always-active handlers: help text and captioning photos.

use async_trait::async_trait;
use tracing::info;

use markoslav_core::{decode_image, encode_png};

use super::replies;
use crate::conversation::ConversationState;
use crate::router::{Action, Filter, HandlerError, Services};
use crate::update::{FileRef, IncomingMessage, Update};

/// Message text that always asks for a caption.
pub const TRIGGER_WORD: &str = "марк";

pub struct Help;

#[async_trait]
impl Action for Help {
    async fn run(
        &self,
        services: &Services,
        update: &Update,
        _state: &mut ConversationState,
    ) -> Result<(), HandlerError> {
        services
            .transport
            .send_message(update.chat(), replies::HELP, None)
            .await?;
        Ok(())
    }
}

/// The photo a message is about: the one it replies to, or its own.
pub fn target_photo(message: &IncomingMessage) -> Option<&FileRef> {
    match &message.reply_to {
        Some(original) => original.photo.as_ref(),
        None => message.photo.as_ref(),
    }
}

/// Whether to caption the photo of `message`.
///
/// The trigger word always works, including in replies to a photo. Other
/// photo messages are captioned when `roll` (uniform in 0..100) is below
/// `percent`; replies never are.
pub fn wants_caption(message: &IncomingMessage, roll: u8, percent: u8) -> bool {
    if target_photo(message).is_none() {
        return false;
    }
    message.body() == Some(TRIGGER_WORD) || (message.reply_to.is_none() && roll < percent)
}

pub fn random_trigger(percent: u8) -> Filter {
    Filter::custom(move |update| {
        update
            .message()
            .is_some_and(|message| wants_caption(message, rand::random_range(0..100), percent))
    })
}

/// Draw a random approved caption onto the photo and send it back.
pub struct RandomCaption;

#[async_trait]
impl Action for RandomCaption {
    async fn run(
        &self,
        services: &Services,
        update: &Update,
        _state: &mut ConversationState,
    ) -> Result<(), HandlerError> {
        let Some(message) = update.message() else {
            return Ok(());
        };
        let Some(file) = target_photo(message) else {
            return Ok(());
        };

        let bytes = services.transport.download_file(file).await?;
        let caption = services.queue.draw_approved().await?;

        let renderer = services.renderer.clone();
        let text = caption.text.clone();
        let png = tokio::task::spawn_blocking(move || {
            let image = decode_image(&bytes)?;
            let rendered = renderer.render(&image, &text)?;
            encode_png(&rendered)
        })
        .await??;

        services
            .transport
            .send_photo(update.chat(), png, message.id)
            .await?;
        info!(key = %update.key, caption_id = %caption.id, "Sent captioned photo");
        Ok(())
    }
}
