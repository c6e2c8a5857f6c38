//! Moderation queue.
//!
//! Owns the lifecycle of a caption: submitted as pending, then either
//! approved (flag set once) or rejected (row deleted). Every call hits the
//! repository immediately. Nothing here coordinates concurrent reviewers: a
//! caption shown in one reviewer's batch may already have been decided by
//! another, in which case the second decision sees `NotFound` (after a
//! reject) or harmlessly re-approves.

use std::sync::Arc;

use tracing::{debug, info};

use crate::caption::{Caption, CaptionId, UserId};
use crate::error::{QueueError, RepositoryError};
use crate::filter::FilterOptions;
use crate::repository::CaptionRepository;

/// Number of pending captions fetched per review session.
pub const DEFAULT_PAGE_SIZE: usize = 25;

#[derive(Clone)]
pub struct ModerationQueue {
    repository: Arc<dyn CaptionRepository>,
}

impl ModerationQueue {
    pub fn new(repository: Arc<dyn CaptionRepository>) -> Self {
        Self { repository }
    }

    /// Submit a new caption for review.
    ///
    /// Fails with [`QueueError::Duplicate`] if any caption (pending or
    /// approved) already has exactly this text.
    pub async fn submit(&self, text: &str, author_id: UserId) -> Result<Caption, QueueError> {
        if self.repository.exists_by_text(text).await? {
            return Err(QueueError::Duplicate);
        }

        let caption = Caption::pending(text, author_id);
        match self.repository.insert(&caption).await {
            Ok(()) => {
                info!(caption_id = %caption.id, author_id = %author_id, "Caption submitted");
                Ok(caption)
            }
            // Lost a race against an identical submission.
            Err(RepositoryError::UniqueViolation { field: "text" }) => Err(QueueError::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    /// Up to `limit` captions matching `filter`, in storage order.
    pub async fn list(
        &self,
        limit: usize,
        offset: usize,
        filter: &FilterOptions,
    ) -> Result<Vec<Caption>, QueueError> {
        Ok(self.repository.select(limit, offset, filter).await?)
    }

    /// Up to `limit` pending captions. Empty once nothing is left to review.
    pub async fn list_pending(&self, limit: usize, offset: usize) -> Result<Vec<Caption>, QueueError> {
        self.list(limit, offset, &FilterOptions::pending()).await
    }

    /// Mark a caption approved. Approving twice leaves it approved.
    pub async fn approve(&self, id: CaptionId) -> Result<(), QueueError> {
        let mut caption = self
            .repository
            .get(id)
            .await?
            .ok_or(QueueError::NotFound(id))?;

        if caption.approved {
            debug!(caption_id = %id, "Caption already approved");
        }
        caption.approved = true;

        if !self.repository.update(&caption).await? {
            // Deleted between the read and the write.
            return Err(QueueError::NotFound(id));
        }
        info!(caption_id = %id, "Caption approved");
        Ok(())
    }

    /// Reject a caption by deleting it.
    pub async fn reject(&self, id: CaptionId) -> Result<(), QueueError> {
        if !self.repository.delete(id).await? {
            return Err(QueueError::NotFound(id));
        }
        info!(caption_id = %id, "Caption rejected");
        Ok(())
    }

    /// A uniformly random approved caption.
    pub async fn draw_approved(&self) -> Result<Caption, QueueError> {
        self.repository
            .random(&FilterOptions::approved())
            .await?
            .ok_or(QueueError::NoneApproved)
    }

    pub async fn pending_count(&self) -> Result<usize, QueueError> {
        Ok(self.repository.count(&FilterOptions::pending()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use async_trait::async_trait;

    fn queue() -> ModerationQueue {
        ModerationQueue::new(Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn test_submit_creates_pending_caption() {
        let queue = queue();
        let caption = queue.submit("foo", UserId(1)).await.unwrap();

        assert!(caption.is_pending());
        let pending = queue.list_pending(DEFAULT_PAGE_SIZE, 0).await.unwrap();
        assert_eq!(pending, vec![caption]);
    }

    #[tokio::test]
    async fn test_second_submission_of_same_text_is_duplicate() {
        let queue = queue();
        queue.submit("foo", UserId(1)).await.unwrap();

        let err = queue.submit("foo", UserId(2)).await.unwrap_err();
        assert!(matches!(err, QueueError::Duplicate));
    }

    #[tokio::test]
    async fn test_duplicate_check_covers_approved_captions() {
        let queue = queue();
        let caption = queue.submit("foo", UserId(1)).await.unwrap();
        queue.approve(caption.id).await.unwrap();

        assert!(matches!(
            queue.submit("foo", UserId(1)).await,
            Err(QueueError::Duplicate)
        ));
    }

    #[tokio::test]
    async fn test_approve_is_idempotent_on_flag() {
        let queue = queue();
        let caption = queue.submit("foo", UserId(1)).await.unwrap();

        queue.approve(caption.id).await.unwrap();
        queue.approve(caption.id).await.unwrap();

        assert!(queue.list_pending(10, 0).await.unwrap().is_empty());
        assert_eq!(queue.draw_approved().await.unwrap().id, caption.id);
    }

    #[tokio::test]
    async fn test_approve_after_reject_is_not_found() {
        let queue = queue();
        let caption = queue.submit("foo", UserId(1)).await.unwrap();

        queue.reject(caption.id).await.unwrap();
        let err = queue.approve(caption.id).await.unwrap_err();
        assert!(matches!(err, QueueError::NotFound(id) if id == caption.id));
    }

    #[tokio::test]
    async fn test_reject_twice_is_not_found() {
        let queue = queue();
        let caption = queue.submit("foo", UserId(1)).await.unwrap();

        queue.reject(caption.id).await.unwrap();
        assert!(queue.reject(caption.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_draw_approved_with_nothing_approved() {
        let queue = queue();
        queue.submit("foo", UserId(1)).await.unwrap();

        let err = queue.draw_approved().await.unwrap_err();
        assert!(matches!(err, QueueError::NoneApproved));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_draw_approved_never_returns_pending() {
        let queue = queue();
        let approved = queue.submit("yes", UserId(1)).await.unwrap();
        queue.approve(approved.id).await.unwrap();
        for i in 0..5 {
            queue.submit(&format!("no {i}"), UserId(1)).await.unwrap();
        }

        for _ in 0..25 {
            let drawn = queue.draw_approved().await.unwrap();
            assert!(drawn.approved);
            assert_eq!(drawn.id, approved.id);
        }
    }

    #[tokio::test]
    async fn test_pending_count() {
        let queue = queue();
        let a = queue.submit("a", UserId(1)).await.unwrap();
        queue.submit("b", UserId(1)).await.unwrap();
        queue.approve(a.id).await.unwrap();

        assert_eq!(queue.pending_count().await.unwrap(), 1);
    }

    /// Repository that says "no such text" and then loses the insert race.
    struct RacingRepository(InMemoryRepository);

    #[async_trait]
    impl CaptionRepository for RacingRepository {
        async fn insert(&self, _caption: &Caption) -> Result<(), RepositoryError> {
            Err(RepositoryError::UniqueViolation { field: "text" })
        }
        async fn exists_by_text(&self, _text: &str) -> Result<bool, RepositoryError> {
            Ok(false)
        }
        async fn get(&self, id: CaptionId) -> Result<Option<Caption>, RepositoryError> {
            self.0.get(id).await
        }
        async fn select(
            &self,
            limit: usize,
            offset: usize,
            filter: &FilterOptions,
        ) -> Result<Vec<Caption>, RepositoryError> {
            self.0.select(limit, offset, filter).await
        }
        async fn update(&self, caption: &Caption) -> Result<bool, RepositoryError> {
            self.0.update(caption).await
        }
        async fn delete(&self, id: CaptionId) -> Result<bool, RepositoryError> {
            self.0.delete(id).await
        }
        async fn random(&self, filter: &FilterOptions) -> Result<Option<Caption>, RepositoryError> {
            self.0.random(filter).await
        }
        async fn count(&self, filter: &FilterOptions) -> Result<usize, RepositoryError> {
            self.0.count(filter).await
        }
    }

    #[tokio::test]
    async fn test_unique_violation_at_insert_is_duplicate() {
        let queue = ModerationQueue::new(Arc::new(RacingRepository(InMemoryRepository::new())));
        assert!(matches!(
            queue.submit("foo", UserId(1)).await,
            Err(QueueError::Duplicate)
        ));
    }

    #[tokio::test]
    async fn test_stale_batch_second_decision_sees_not_found() {
        let queue = queue();
        let caption = queue.submit("foo", UserId(1)).await.unwrap();

        // Two reviewers fetch the same snapshot.
        let batch_a = queue.list_pending(DEFAULT_PAGE_SIZE, 0).await.unwrap();
        let batch_b = queue.list_pending(DEFAULT_PAGE_SIZE, 0).await.unwrap();
        assert_eq!(batch_a, batch_b);

        queue.reject(batch_a[0].id).await.unwrap();
        let err = queue.approve(batch_b[0].id).await.unwrap_err();
        assert!(matches!(err, QueueError::NotFound(id) if id == caption.id));
    }
}
