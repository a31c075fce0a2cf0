use std::sync::Arc;

use super::error::CatalogError;
use super::models::{Book, BookId, BookInput};
use super::store::BookStore;

/// Business rules for the catalog.
///
/// Holds nothing but the injected store; all concurrency control is the
/// store's compare-and-swap and uniqueness guarantees.
#[derive(Clone)]
pub struct BookService {
    store: Arc<dyn BookStore>,
}

impl BookService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    /// Add a book. The isbn pre-check gives the common case a clean error; a
    /// creator racing past it is still stopped by the store.
    pub async fn create(&self, candidate: BookInput) -> Result<Book, CatalogError> {
        if self.store.exists_by_isbn(&candidate.isbn).await? {
            tracing::warn!(isbn = %candidate.isbn, "rejecting book with duplicate isbn");
            return Err(CatalogError::DuplicateIsbn(candidate.isbn));
        }

        let book = self.store.insert(candidate).await?;
        tracing::info!(book_id = book.id, isbn = %book.isbn, "book created");
        Ok(book)
    }

    pub async fn list(&self) -> Result<Vec<Book>, CatalogError> {
        Ok(self.store.find_all().await?)
    }

    /// Absence is a normal outcome here, not an error.
    pub async fn get_by_id(&self, id: BookId) -> Result<Option<Book>, CatalogError> {
        Ok(self.store.find_by_id(id).await?)
    }

    /// Replace a book's fields if `version` is still the stored one.
    ///
    /// The version is checked before isbn uniqueness, so a stale update is
    /// always a conflict even when it also collides on isbn.
    ///
    /// Never retries: a lost race surfaces as
    /// [`CatalogError::ConcurrentModification`] and the caller must re-read.
    pub async fn update(
        &self,
        id: BookId,
        changes: BookInput,
        version: u64,
    ) -> Result<Book, CatalogError> {
        if !self.store.exists_by_id(id).await? {
            return Err(CatalogError::NotFound(id));
        }

        match self.store.update_if_version_matches(id, changes, version).await {
            Ok(book) => {
                tracing::info!(book_id = id, version = book.version, "book updated");
                Ok(book)
            }
            Err(e) => {
                tracing::warn!(book_id = id, version, error = %e, "book update rejected");
                Err(e.into())
            }
        }
    }

    pub async fn delete(&self, id: BookId) -> Result<(), CatalogError> {
        if !self.store.delete_by_id(id).await? {
            return Err(CatalogError::NotFound(id));
        }
        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::modules::books::models::INITIAL_VERSION;
    use crate::modules::books::store::{InMemoryBookStore, StoreError};

    fn service() -> BookService {
        BookService::new(Arc::new(InMemoryBookStore::new()))
    }

    fn input(title: &str, author: &str, isbn: &str) -> BookInput {
        BookInput {
            title: title.to_string(),
            author: author.to_string(),
            isbn: isbn.to_string(),
            available: true,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let service = service();
        let created = service
            .create(input("Sample Book", "Author A", "ISBN-1234567890"))
            .await
            .unwrap();

        assert!(created.available);
        assert_eq!(created.version, INITIAL_VERSION);

        let fetched = service.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.title, "Sample Book");
        assert_eq!(fetched.author, "Author A");
        assert_eq!(fetched.isbn, "ISBN-1234567890");
    }

    #[tokio::test]
    async fn optimistic_lock_scenario() {
        let service = service();
        let original = service
            .create(input("Sample Book", "Author A", "ISBN-1234567890"))
            .await
            .unwrap();

        let mut changes = input("Sample Book", "Author A", "ISBN-1234567890");
        changes.available = false;
        let updated = service
            .update(original.id, changes.clone(), original.version)
            .await
            .unwrap();
        assert_eq!(updated.version, original.version + 1);
        assert!(!updated.available);

        let err = service
            .update(original.id, changes, original.version)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::ConcurrentModification(id) if id == original.id));
        assert_eq!(
            err.to_string(),
            format!("Concurrent update detected for book with id: {}", original.id)
        );

        // The failed attempt left the record exactly as the winner wrote it.
        assert_eq!(service.get_by_id(original.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn duplicate_isbn_leaves_one_record() {
        let service = service();
        service.create(input("First", "A", "X")).await.unwrap();

        let err = service.create(input("Second", "B", "X")).await.unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateIsbn(ref isbn) if isbn == "X"));

        let books = service.list().await.unwrap();
        assert_eq!(books.iter().filter(|b| b.isbn == "X").count(), 1);
        assert_eq!(books.len(), 1);
    }

    #[tokio::test]
    async fn missing_book_is_absent_not_an_error() {
        assert_eq!(service().get_by_id(9999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_of_missing_book_is_not_found() {
        let err = service()
            .update(9999, input("T", "A", "I"), INITIAL_VERSION)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(9999)));
    }

    #[tokio::test]
    async fn update_to_foreign_isbn_is_duplicate() {
        let service = service();
        let mine = service.create(input("Mine", "A", "MINE")).await.unwrap();
        service.create(input("Theirs", "B", "THEIRS")).await.unwrap();

        let err = service
            .update(mine.id, input("Mine", "A", "THEIRS"), mine.version)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateIsbn(_)));
        assert_eq!(service.get_by_id(mine.id).await.unwrap(), Some(mine));
    }

    #[tokio::test]
    async fn stale_version_wins_over_isbn_collision() {
        let service = service();
        let mine = service.create(input("Mine", "A", "MINE")).await.unwrap();
        service.create(input("Theirs", "B", "THEIRS")).await.unwrap();

        let current = service
            .update(mine.id, input("Mine", "A", "MINE"), mine.version)
            .await
            .unwrap();

        let err = service
            .update(mine.id, input("Mine", "A", "THEIRS"), mine.version)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::ConcurrentModification(id) if id == mine.id));
        assert_eq!(service.get_by_id(mine.id).await.unwrap(), Some(current));
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let service = service();
        let book = service.create(input("T", "A", "I")).await.unwrap();

        service.delete(book.id).await.unwrap();
        assert_eq!(service.get_by_id(book.id).await.unwrap(), None);

        let err = service.delete(book.id).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(id) if id == book.id));
    }

    #[tokio::test]
    async fn list_follows_insertion_order() {
        let service = service();
        for isbn in ["C", "A", "B"] {
            service.create(input(isbn, "Author", isbn)).await.unwrap();
        }

        let isbns: Vec<String> = service
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.isbn)
            .collect();
        assert_eq!(isbns, ["C", "A", "B"]);
    }

    /// Store whose isbn pre-check always misses, as if a concurrent creator
    /// slipped in between the check and the insert.
    struct RacingStore {
        inner: InMemoryBookStore,
    }

    #[async_trait]
    impl BookStore for RacingStore {
        async fn find_all(&self) -> Result<Vec<Book>, StoreError> {
            self.inner.find_all().await
        }

        async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, StoreError> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_isbn(&self, _isbn: &str) -> Result<Option<Book>, StoreError> {
            Ok(None)
        }

        async fn exists_by_isbn(&self, _isbn: &str) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn insert(&self, book: BookInput) -> Result<Book, StoreError> {
            self.inner.insert(book).await
        }

        async fn update_if_version_matches(
            &self,
            id: BookId,
            changes: BookInput,
            expected_version: u64,
        ) -> Result<Book, StoreError> {
            self.inner
                .update_if_version_matches(id, changes, expected_version)
                .await
        }

        async fn delete_by_id(&self, id: BookId) -> Result<bool, StoreError> {
            self.inner.delete_by_id(id).await
        }
    }

    #[tokio::test]
    async fn store_uniqueness_is_the_final_guard() {
        let service = BookService::new(Arc::new(RacingStore {
            inner: InMemoryBookStore::new(),
        }));
        let first = service.create(input("First", "A", "X")).await.unwrap();
        service.create(input("Other", "B", "Y")).await.unwrap();

        let err = service.create(input("Second", "B", "X")).await.unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateIsbn(_)));

        let err = service
            .update(first.id, input("First", "A", "Y"), first.version)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateIsbn(_)));
    }

    struct BrokenStore;

    #[async_trait]
    impl BookStore for BrokenStore {
        async fn find_all(&self) -> Result<Vec<Book>, StoreError> {
            Err(anyhow::anyhow!("connection reset").into())
        }

        async fn find_by_id(&self, _id: BookId) -> Result<Option<Book>, StoreError> {
            Err(anyhow::anyhow!("connection reset").into())
        }

        async fn find_by_isbn(&self, _isbn: &str) -> Result<Option<Book>, StoreError> {
            Err(anyhow::anyhow!("connection reset").into())
        }

        async fn insert(&self, _book: BookInput) -> Result<Book, StoreError> {
            Err(anyhow::anyhow!("connection reset").into())
        }

        async fn update_if_version_matches(
            &self,
            _id: BookId,
            _changes: BookInput,
            _expected_version: u64,
        ) -> Result<Book, StoreError> {
            Err(anyhow::anyhow!("connection reset").into())
        }

        async fn delete_by_id(&self, _id: BookId) -> Result<bool, StoreError> {
            Err(anyhow::anyhow!("connection reset").into())
        }
    }

    #[tokio::test]
    async fn backend_faults_surface_as_internal() {
        let service = BookService::new(Arc::new(BrokenStore));

        assert!(matches!(service.list().await, Err(CatalogError::Internal(_))));
        assert!(matches!(service.get_by_id(1).await, Err(CatalogError::Internal(_))));
        assert!(matches!(
            service.create(input("T", "A", "I")).await,
            Err(CatalogError::Internal(_))
        ));
        assert!(matches!(service.delete(1).await, Err(CatalogError::Internal(_))));
    }
}
