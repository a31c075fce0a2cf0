//! Persistence contract for the catalog and its backends.

mod memory;
mod sled_store;

pub use self::memory::InMemoryBookStore;
pub use self::sled_store::SledBookStore;

use async_trait::async_trait;
use thiserror::Error;

use super::models::{Book, BookId, BookInput};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The isbn belongs to another record.
    #[error("isbn '{0}' is already taken")]
    DuplicateIsbn(String),

    /// No record with this id exists.
    #[error("book {0} does not exist")]
    Missing(BookId),

    /// The stored version moved on since the caller read it.
    #[error("version mismatch for book {id}: expected {expected}, actual {actual}")]
    VersionMismatch {
        id: BookId,
        expected: u64,
        actual: u64,
    },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Book persistence. Every method is atomic with respect to the others.
///
/// Implementations enforce isbn uniqueness themselves; callers may check
/// first for a friendlier error but must not rely on it.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// All records in insertion order.
    async fn find_all(&self) -> Result<Vec<Book>, StoreError>;

    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, StoreError>;

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>, StoreError>;

    async fn exists_by_id(&self, id: BookId) -> Result<bool, StoreError> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool, StoreError> {
        Ok(self.find_by_isbn(isbn).await?.is_some())
    }

    /// Persist a new record with a fresh id and the initial version.
    ///
    /// Fails with [`StoreError::DuplicateIsbn`] without side effects.
    async fn insert(&self, book: BookInput) -> Result<Book, StoreError>;

    /// Replace the fields of `id` only if its stored version equals
    /// `expected_version`, bumping the version by one.
    ///
    /// Fails with [`StoreError::Missing`], [`StoreError::VersionMismatch`] or
    /// [`StoreError::DuplicateIsbn`]; on failure nothing is written.
    async fn update_if_version_matches(
        &self,
        id: BookId,
        changes: BookInput,
        expected_version: u64,
    ) -> Result<Book, StoreError>;

    /// Remove a record, reporting whether one was there.
    async fn delete_by_id(&self, id: BookId) -> Result<bool, StoreError>;
}
