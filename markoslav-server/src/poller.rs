//! Long-polling loop feeding updates into the scheduler.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::scheduler::ConversationScheduler;
use crate::telegram::{to_update, TelegramClient, TgUpdate};
use crate::transport::TransportError;

pub const LONG_POLL_TIMEOUT_SECS: u64 = 60;

/// Quiet period after which the startup backlog counts as drained.
pub const DRAIN_SILENCE_SECS: u64 = 5;

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Offset that acknowledges every update in `updates`.
pub fn next_offset(updates: &[TgUpdate], current: Option<i64>) -> Option<i64> {
    updates
        .iter()
        .map(|u| u.update_id + 1)
        .max()
        .or(current)
}

/// Skip everything that arrived while the bot was offline.
///
/// Returns the offset to continue polling from.
pub async fn drain_backlog(client: &TelegramClient) -> Result<Option<i64>, TransportError> {
    let mut offset = None;
    let mut skipped = 0;
    loop {
        let updates = client.get_updates(offset, DRAIN_SILENCE_SECS).await?;
        if updates.is_empty() {
            info!("Skipped {} stale updates", skipped);
            return Ok(offset);
        }
        skipped += updates.len();
        offset = next_offset(&updates, offset);
    }
}

/// Poll forever. Errors are logged and retried after a fixed delay.
pub async fn poll_loop(
    client: TelegramClient,
    scheduler: Arc<ConversationScheduler>,
    mut offset: Option<i64>,
) {
    loop {
        let updates = match client.get_updates(offset, LONG_POLL_TIMEOUT_SECS).await {
            Ok(updates) => updates,
            Err(e) => {
                error!("Failed to poll for updates: {}", e);
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        offset = next_offset(&updates, offset);
        for raw in &updates {
            match to_update(raw) {
                Some(update) => scheduler.submit(update).await,
                None => debug!(update_id = raw.update_id, "Ignoring unsupported update"),
            }
        }
    }
}
