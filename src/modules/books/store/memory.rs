use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BookStore, StoreError};
use crate::modules::books::models::{Book, BookId, BookInput};

#[derive(Default)]
struct Tables {
    last_id: BookId,
    books: BTreeMap<BookId, Book>,
    by_isbn: HashMap<String, BookId>,
}

/// Process-local store. A single lock guards the rows and the isbn index so
/// every operation sees and leaves them consistent.
#[derive(Default)]
pub struct InMemoryBookStore {
    tables: RwLock<Tables>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn find_all(&self) -> Result<Vec<Book>, StoreError> {
        Ok(self.tables.read().await.books.values().cloned().collect())
    }

    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        Ok(self.tables.read().await.books.get(&id).cloned())
    }

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_isbn
            .get(isbn)
            .and_then(|id| tables.books.get(id))
            .cloned())
    }

    async fn exists_by_id(&self, id: BookId) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.books.contains_key(&id))
    }

    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.by_isbn.contains_key(isbn))
    }

    async fn insert(&self, book: BookInput) -> Result<Book, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.by_isbn.contains_key(&book.isbn) {
            return Err(StoreError::DuplicateIsbn(book.isbn));
        }

        tables.last_id += 1;
        let book = Book::new(tables.last_id, book);
        tables.by_isbn.insert(book.isbn.clone(), book.id);
        tables.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update_if_version_matches(
        &self,
        id: BookId,
        changes: BookInput,
        expected_version: u64,
    ) -> Result<Book, StoreError> {
        let mut tables = self.tables.write().await;
        let Tables { books, by_isbn, .. } = &mut *tables;

        let current = books.get_mut(&id).ok_or(StoreError::Missing(id))?;
        if current.version != expected_version {
            return Err(StoreError::VersionMismatch {
                id,
                expected: expected_version,
                actual: current.version,
            });
        }

        if current.isbn != changes.isbn {
            if let Some(owner) = by_isbn.get(&changes.isbn) {
                if *owner != id {
                    return Err(StoreError::DuplicateIsbn(changes.isbn));
                }
            }
            by_isbn.remove(&current.isbn);
            by_isbn.insert(changes.isbn.clone(), id);
        }

        *current = current.revised(changes);
        Ok(current.clone())
    }

    async fn delete_by_id(&self, id: BookId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.books.remove(&id) {
            Some(book) => {
                tables.by_isbn.remove(&book.isbn);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
