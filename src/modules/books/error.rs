use libris_http::AppError;
use thiserror::Error;

use super::models::BookId;
use super::store::StoreError;
use super::validation::ValidationFailure;

/// Failures the catalog service reports to its callers.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Book not found with id: {0}")]
    NotFound(BookId),

    #[error("Book with ISBN {0} already exists")]
    DuplicateIsbn(String),

    #[error("Concurrent update detected for book with id: {0}")]
    ConcurrentModification(BookId),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for CatalogError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateIsbn(isbn) => CatalogError::DuplicateIsbn(isbn),
            StoreError::Missing(id) => CatalogError::NotFound(id),
            StoreError::VersionMismatch { id, .. } => CatalogError::ConcurrentModification(id),
            StoreError::Backend(e) => CatalogError::Internal(e),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::NotFound(_) => AppError::not_found(error.to_string()),
            CatalogError::DuplicateIsbn(_) => AppError::duplicate(error.to_string()),
            CatalogError::ConcurrentModification(_) => AppError::conflict(error.to_string()),
            CatalogError::Internal(e) => AppError::Internal(e),
        }
    }
}

impl From<ValidationFailure> for AppError {
    fn from(failure: ValidationFailure) -> Self {
        AppError::validation(failure.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn every_catalog_error_has_one_status() {
        let cases = [
            (CatalogError::NotFound(7), StatusCode::NOT_FOUND, "Resource Not Found"),
            (
                CatalogError::DuplicateIsbn("X".to_string()),
                StatusCode::BAD_REQUEST,
                "Duplicate Resource",
            ),
            (
                CatalogError::ConcurrentModification(7),
                StatusCode::CONFLICT,
                "Conflict",
            ),
            (
                CatalogError::Internal(anyhow::anyhow!("disk on fire")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
            ),
        ];

        for (error, status, category) in cases {
            let app: AppError = error.into();
            assert_eq!(app.status(), status);
            assert_eq!(app.category(), category);
        }
    }

    #[test]
    fn messages_carry_the_subject() {
        let body = AppError::from(CatalogError::NotFound(9999)).to_body();
        assert_eq!(body.message, "Book not found with id: 9999");

        let body = AppError::from(CatalogError::ConcurrentModification(3)).to_body();
        assert_eq!(body.message, "Concurrent update detected for book with id: 3");

        let body = AppError::from(CatalogError::DuplicateIsbn("ISBN-1".to_string())).to_body();
        assert_eq!(body.message, "Book with ISBN ISBN-1 already exists");
    }

    #[test]
    fn store_signals_stay_distinct() {
        assert!(matches!(
            CatalogError::from(StoreError::Missing(1)),
            CatalogError::NotFound(1)
        ));
        assert!(matches!(
            CatalogError::from(StoreError::VersionMismatch {
                id: 1,
                expected: 0,
                actual: 1
            }),
            CatalogError::ConcurrentModification(1)
        ));
    }

    #[test]
    fn validation_failure_maps_to_client_error() {
        let app = AppError::from(ValidationFailure::new("title", "must not be blank"));
        assert_eq!(app.status(), StatusCode::BAD_REQUEST);
        assert_eq!(app.to_body().message, "title: must not be blank");
    }
}
