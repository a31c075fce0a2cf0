use anyhow::{anyhow, Context};
use async_trait::async_trait;
use sled::{
    transaction::{abort, ConflictableTransactionError, TransactionError, TransactionResult},
    Db, IVec, Transactional, Tree,
};
use tokio::task::spawn_blocking;

use super::{BookStore, StoreError};
use crate::modules::books::models::{Book, BookId, BookInput};

const BOOKS_TREE: &str = "books";
const ISBN_INDEX_TREE: &str = "books_by_isbn";

/// Durable store on two sled trees.
///
/// `books` maps big-endian ids to JSON records, so iteration follows
/// insertion order. `books_by_isbn` maps isbn to id and is the uniqueness
/// guard: every write touching it runs in a transaction over both trees.
#[derive(Clone)]
pub struct SledBookStore {
    db: Db,
    books: Tree,
    by_isbn: Tree,
}

impl SledBookStore {
    pub fn open(db: Db) -> anyhow::Result<Self> {
        let books = db
            .open_tree(BOOKS_TREE)
            .with_context(|| format!("failed to open sled tree '{BOOKS_TREE}'"))?;
        let by_isbn = db
            .open_tree(ISBN_INDEX_TREE)
            .with_context(|| format!("failed to open sled tree '{ISBN_INDEX_TREE}'"))?;

        Ok(Self { db, books, by_isbn })
    }

    /// Run blocking sled work off the async executor.
    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(SledBookStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        spawn_blocking(move || op(store))
            .await
            .map_err(|e| StoreError::Backend(anyhow!("storage task failed: {e}")))?
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.db.flush().context("failed to flush sled database")?;
        Ok(())
    }
}

impl From<sled::Error> for StoreError {
    fn from(error: sled::Error) -> Self {
        StoreError::Backend(anyhow::Error::new(error))
    }
}

fn id_key(id: BookId) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

fn decode_id(bytes: &IVec) -> Result<BookId, StoreError> {
    let raw: [u8; 8] = bytes
        .as_ref()
        .try_into()
        .map_err(|_| anyhow!("corrupt isbn index entry of {} bytes", bytes.len()))?;
    Ok(BookId::from_be_bytes(raw))
}

fn encode(book: &Book) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(book)
        .with_context(|| format!("failed to encode book {}", book.id))
        .map_err(StoreError::Backend)
}

fn decode(bytes: &IVec) -> Result<Book, StoreError> {
    serde_json::from_slice(bytes)
        .context("failed to decode stored book")
        .map_err(StoreError::Backend)
}

fn settle<T>(result: TransactionResult<T, StoreError>) -> Result<T, StoreError> {
    result.map_err(|e| match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => e.into(),
    })
}

#[async_trait]
impl BookStore for SledBookStore {
    async fn find_all(&self) -> Result<Vec<Book>, StoreError> {
        self.blocking(|store| {
            store
                .books
                .iter()
                .values()
                .map(|value| decode(&value?))
                .collect()
        })
        .await
    }

    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        self.blocking(move |store| {
            store
                .books
                .get(id_key(id))?
                .map(|value| decode(&value))
                .transpose()
        })
        .await
    }

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>, StoreError> {
        let isbn = isbn.to_string();
        self.blocking(move |store| {
            let result: TransactionResult<Option<Book>, StoreError> = (&store.books, &store.by_isbn)
                .transaction(|(books, by_isbn)| {
                    let Some(id) = by_isbn.get(isbn.as_bytes())? else {
                        return Ok(None);
                    };
                    let id = decode_id(&id).map_err(ConflictableTransactionError::Abort)?;
                    match books.get(id_key(id))? {
                        Some(value) => Ok(Some(
                            decode(&value).map_err(ConflictableTransactionError::Abort)?,
                        )),
                        None => Ok(None),
                    }
                });
            settle(result)
        })
        .await
    }

    async fn exists_by_id(&self, id: BookId) -> Result<bool, StoreError> {
        self.blocking(move |store| Ok(store.books.contains_key(id_key(id))?))
            .await
    }

    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool, StoreError> {
        let isbn = isbn.to_string();
        self.blocking(move |store| Ok(store.by_isbn.contains_key(isbn.as_bytes())?))
            .await
    }

    async fn insert(&self, book: BookInput) -> Result<Book, StoreError> {
        self.blocking(move |store| {
            // generate_id starts at zero; ids handed out are 1-based. A
            // rejected insert burns its id, which keeps ids unique.
            let id = store.db.generate_id()? + 1;
            let key = id_key(id);

            let result: TransactionResult<Book, StoreError> = (&store.books, &store.by_isbn)
                .transaction(|(books, by_isbn)| {
                    if by_isbn.get(book.isbn.as_bytes())?.is_some() {
                        return abort(StoreError::DuplicateIsbn(book.isbn.clone()));
                    }

                    let record = Book::new(id, book.clone());
                    let value = encode(&record).map_err(ConflictableTransactionError::Abort)?;
                    by_isbn.insert(book.isbn.as_bytes(), key.clone())?;
                    books.insert(key.clone(), value)?;
                    Ok(record)
                });

            let record = settle(result)?;
            store.flush()?;
            Ok(record)
        })
        .await
    }

    async fn update_if_version_matches(
        &self,
        id: BookId,
        changes: BookInput,
        expected_version: u64,
    ) -> Result<Book, StoreError> {
        self.blocking(move |store| {
            let key = id_key(id);

            let result: TransactionResult<Book, StoreError> = (&store.books, &store.by_isbn)
                .transaction(|(books, by_isbn)| {
                    let current = match books.get(&key)? {
                        Some(value) => decode(&value).map_err(ConflictableTransactionError::Abort)?,
                        None => return abort(StoreError::Missing(id)),
                    };

                    if current.version != expected_version {
                        return abort(StoreError::VersionMismatch {
                            id,
                            expected: expected_version,
                            actual: current.version,
                        });
                    }

                    if current.isbn != changes.isbn {
                        if let Some(owner) = by_isbn.get(changes.isbn.as_bytes())? {
                            let owner = decode_id(&owner).map_err(ConflictableTransactionError::Abort)?;
                            if owner != id {
                                return abort(StoreError::DuplicateIsbn(changes.isbn.clone()));
                            }
                        }
                        by_isbn.remove(current.isbn.as_bytes())?;
                        by_isbn.insert(changes.isbn.as_bytes(), key.clone())?;
                    }

                    let updated = current.revised(changes.clone());
                    let value = encode(&updated).map_err(ConflictableTransactionError::Abort)?;
                    books.insert(key.clone(), value)?;
                    Ok(updated)
                });

            let updated = settle(result)?;
            store.flush()?;
            Ok(updated)
        })
        .await
    }

    async fn delete_by_id(&self, id: BookId) -> Result<bool, StoreError> {
        self.blocking(move |store| {
            let key = id_key(id);

            let result: TransactionResult<bool, StoreError> = (&store.books, &store.by_isbn)
                .transaction(|(books, by_isbn)| {
                    let Some(value) = books.remove(key.clone())? else {
                        return Ok(false);
                    };
                    let book = decode(&value).map_err(ConflictableTransactionError::Abort)?;
                    by_isbn.remove(book.isbn.as_bytes())?;
                    Ok(true)
                });

            let deleted = settle(result)?;
            if deleted {
                store.flush()?;
            }
            Ok(deleted)
        })
        .await
    }
}
