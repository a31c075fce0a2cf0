use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::validation::not_blank;

/// Store-assigned book identifier. Never reused after deletion.
pub type BookId = u64;

/// Version every book starts at; each successful update adds one.
pub const INITIAL_VERSION: u64 = 0;

/// A book in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    /// Unique identifier assigned on creation
    pub id: BookId,
    /// Title of the book
    pub title: String,
    /// Author of the book
    pub author: String,
    /// ISBN, unique across the catalog
    pub isbn: String,
    /// Whether the book can currently be lent out
    pub available: bool,
    /// Optimistic-lock token; send it back unchanged when updating
    pub version: u64,
}

impl Book {
    /// Materialize a freshly inserted record.
    pub fn new(id: BookId, input: BookInput) -> Self {
        Self {
            id,
            title: input.title,
            author: input.author,
            isbn: input.isbn,
            available: input.available,
            version: INITIAL_VERSION,
        }
    }

    /// The record after `changes` have been applied on top of this one.
    pub fn revised(&self, changes: BookInput) -> Self {
        Self {
            id: self.id,
            title: changes.title,
            author: changes.author,
            isbn: changes.isbn,
            available: changes.available,
            version: self.version + 1,
        }
    }
}

/// Validated, normalized book fields handed to the service and the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub available: bool,
}

/// Request model for creating a new book.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    /// Title of the book
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "must not be blank"))]
    pub title: String,
    /// Author of the book
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "must not be blank"))]
    pub author: String,
    /// ISBN, must not already be in the catalog
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "must not be blank"))]
    pub isbn: String,
    /// Defaults to true
    #[serde(default)]
    pub available: Option<bool>,
}

/// Request model for replacing a book's fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    /// Title of the book
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "must not be blank"))]
    pub title: String,
    /// Author of the book
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "must not be blank"))]
    pub author: String,
    /// ISBN, must not belong to another book
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "must not be blank"))]
    pub isbn: String,
    /// Defaults to true
    #[serde(default)]
    pub available: Option<bool>,
    /// Version the caller last read; checked after the text fields
    #[serde(default)]
    pub version: Option<u64>,
}
