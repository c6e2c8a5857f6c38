//! Repository abstraction for caption persistence.
//!
//! This module defines the `CaptionRepository` trait that abstracts the
//! CRUD operations the moderation queue needs. Implementations provide the
//! actual backend (in-memory for tests, SQLite for the running bot).

mod memory;
mod sqlite;

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

use async_trait::async_trait;

use crate::caption::{Caption, CaptionId};
use crate::error::RepositoryError;
use crate::filter::FilterOptions;

/// Storage backend for captions.
///
/// Every call is persisted immediately; nothing is buffered and no two calls
/// are combined into a transaction.
#[async_trait]
pub trait CaptionRepository: Send + Sync {
    /// Insert a new row. Fails with `UniqueViolation` if the text is taken.
    async fn insert(&self, caption: &Caption) -> Result<(), RepositoryError>;

    /// Whether any caption (pending or approved) has exactly this text.
    async fn exists_by_text(&self, text: &str) -> Result<bool, RepositoryError>;

    async fn get(&self, id: CaptionId) -> Result<Option<Caption>, RepositoryError>;

    /// Up to `limit` rows matching `filter`, skipping `offset`, in creation
    /// order.
    async fn select(
        &self,
        limit: usize,
        offset: usize,
        filter: &FilterOptions,
    ) -> Result<Vec<Caption>, RepositoryError>;

    /// Overwrite the row with the same id. Returns false if no row matched.
    async fn update(&self, caption: &Caption) -> Result<bool, RepositoryError>;

    /// Delete a row. Returns false if no row matched.
    async fn delete(&self, id: CaptionId) -> Result<bool, RepositoryError>;

    /// One row chosen uniformly at random among those matching `filter`.
    async fn random(&self, filter: &FilterOptions) -> Result<Option<Caption>, RepositoryError>;

    async fn count(&self, filter: &FilterOptions) -> Result<usize, RepositoryError>;
}
