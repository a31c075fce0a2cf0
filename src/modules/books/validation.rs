//! Input normalization and validation for book payloads.
//!
//! Payloads are trimmed, validated with `validator`, and only then turned into
//! a [`BookInput`]. Failures are reduced to the first offending field in
//! declaration order so clients get one stable message.

use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

use super::models::{BookInput, CreateBook, UpdateBook};

const TEXT_FIELDS: &[&str] = &["title", "author", "isbn"];

/// A rejected payload: the first offending field and why.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationFailure {
    pub field: String,
    pub reason: String,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Rejects empty and whitespace-only text.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn normalize(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn first_failure(errors: &ValidationErrors, order: &[&str]) -> ValidationFailure {
    let fields = errors.field_errors();

    order
        .iter()
        .find_map(|field| {
            let error = fields.get(*field)?.first()?;
            let reason = error
                .message
                .as_ref()
                .map(|message| message.to_string())
                .unwrap_or_else(|| error.code.to_string());
            Some(ValidationFailure::new(*field, reason))
        })
        .unwrap_or_else(|| ValidationFailure::new("body", errors.to_string()))
}

impl CreateBook {
    /// Trim, validate, and apply defaults.
    pub fn into_input(mut self) -> Result<BookInput, ValidationFailure> {
        normalize(&mut self.title);
        normalize(&mut self.author);
        normalize(&mut self.isbn);

        self.validate()
            .map_err(|errors| first_failure(&errors, TEXT_FIELDS))?;

        Ok(BookInput {
            title: self.title,
            author: self.author,
            isbn: self.isbn,
            available: self.available.unwrap_or(true),
        })
    }
}

impl UpdateBook {
    /// Trim, validate, and split into the new fields plus the caller's version.
    pub fn into_input(mut self) -> Result<(BookInput, u64), ValidationFailure> {
        normalize(&mut self.title);
        normalize(&mut self.author);
        normalize(&mut self.isbn);

        self.validate()
            .map_err(|errors| first_failure(&errors, TEXT_FIELDS))?;

        let version = self
            .version
            .ok_or_else(|| ValidationFailure::new("version", "must not be null"))?;

        let input = BookInput {
            title: self.title,
            author: self.author,
            isbn: self.isbn,
            available: self.available.unwrap_or(true),
        };
        Ok((input, version))
    }
}
