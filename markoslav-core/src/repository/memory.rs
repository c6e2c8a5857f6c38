//! In-memory implementation of `CaptionRepository`.
//!
//! Rows live in a `Vec` in insertion order behind a `RwLock`. All data is
//! lost on restart.

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use tokio::sync::RwLock;

use super::CaptionRepository;
use crate::caption::{Caption, CaptionId};
use crate::error::RepositoryError;
use crate::filter::FilterOptions;

pub struct InMemoryRepository {
    rows: RwLock<Vec<Caption>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptionRepository for InMemoryRepository {
    async fn insert(&self, caption: &Caption) -> Result<(), RepositoryError> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|row| row.text == caption.text) {
            return Err(RepositoryError::UniqueViolation { field: "text" });
        }
        if rows.iter().any(|row| row.id == caption.id) {
            return Err(RepositoryError::UniqueViolation { field: "id" });
        }
        rows.push(caption.clone());
        Ok(())
    }

    async fn exists_by_text(&self, text: &str) -> Result<bool, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().any(|row| row.text == text))
    }

    async fn get(&self, id: CaptionId) -> Result<Option<Caption>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|row| row.id == id).cloned())
    }

    async fn select(
        &self,
        limit: usize,
        offset: usize,
        filter: &FilterOptions,
    ) -> Result<Vec<Caption>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|row| filter.matches(row))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update(&self, caption: &Caption) -> Result<bool, RepositoryError> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|row| row.id == caption.id) {
            Some(row) => {
                *row = caption.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: CaptionId) -> Result<bool, RepositoryError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| row.id != id);
        Ok(rows.len() != before)
    }

    async fn random(&self, filter: &FilterOptions) -> Result<Option<Caption>, RepositoryError> {
        let rows = self.rows.read().await;
        let candidates: Vec<&Caption> = rows.iter().filter(|row| filter.matches(row)).collect();
        Ok(candidates.choose(&mut rand::rng()).map(|c| (*c).clone()))
    }

    async fn count(&self, filter: &FilterOptions) -> Result<usize, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|row| filter.matches(row)).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::UserId;

    #[tokio::test]
    async fn test_get_returns_none_for_missing() {
        let repo = InMemoryRepository::new();
        assert!(repo.get(CaptionId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let repo = InMemoryRepository::new();
        let caption = Caption::pending("foo", UserId(1));
        repo.insert(&caption).await.unwrap();

        assert_eq!(repo.get(caption.id).await.unwrap(), Some(caption));
    }

    #[tokio::test]
    async fn test_insert_duplicate_text_is_unique_violation() {
        let repo = InMemoryRepository::new();
        repo.insert(&Caption::pending("foo", UserId(1))).await.unwrap();

        let err = repo
            .insert(&Caption::pending("foo", UserId(2)))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueViolation { field: "text" }));
    }

    #[tokio::test]
    async fn test_select_respects_order_limit_and_offset() {
        let repo = InMemoryRepository::new();
        for text in ["a", "b", "c", "d"] {
            repo.insert(&Caption::pending(text, UserId(1))).await.unwrap();
        }

        let page = repo.select(2, 1, &FilterOptions::pending()).await.unwrap();
        let texts: Vec<_> = page.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_delete_reports_whether_row_existed() {
        let repo = InMemoryRepository::new();
        let caption = Caption::pending("foo", UserId(1));
        repo.insert(&caption).await.unwrap();

        assert!(repo.delete(caption.id).await.unwrap());
        assert!(!repo.delete(caption.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_random_only_draws_matching_rows() {
        let repo = InMemoryRepository::new();
        let mut approved = Caption::pending("approved", UserId(1));
        approved.approved = true;
        repo.insert(&approved).await.unwrap();
        repo.insert(&Caption::pending("pending", UserId(1))).await.unwrap();

        for _ in 0..20 {
            let drawn = repo.random(&FilterOptions::approved()).await.unwrap();
            assert_eq!(drawn.map(|c| c.text), Some("approved".to_string()));
        }
    }

    #[tokio::test]
    async fn test_random_on_empty_set_is_none() {
        let repo = InMemoryRepository::new();
        repo.insert(&Caption::pending("pending", UserId(1))).await.unwrap();
        assert!(repo.random(&FilterOptions::approved()).await.unwrap().is_none());
    }
}
