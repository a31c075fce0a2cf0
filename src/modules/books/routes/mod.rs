//! HTTP handlers for the books module.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use libris_http::AppError;

use super::error::CatalogError;
use super::models::{Book, BookId, CreateBook, UpdateBook};
use super::service::BookService;

/// Routes relative to the module mount point (`/api/books`).
pub fn router(service: BookService) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(service)
}

fn book_id(id: Result<Path<BookId>, PathRejection>) -> Result<BookId, AppError> {
    id.map(|Path(id)| id)
        .map_err(|rejection| AppError::validation(format!("id: {}", rejection.body_text())))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(payload)| payload)
        .map_err(|rejection| AppError::validation(format!("body: {}", rejection.body_text())))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(State(service): State<BookService>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(service.list().await?))
}

async fn create_book(
    State(service): State<BookService>,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let input = body(payload)?.into_input()?;
    Ok(Json(service.create(input).await?))
}

async fn get_book(
    State(service): State<BookService>,
    id: Result<Path<BookId>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let id = book_id(id)?;
    let book = service
        .get_by_id(id)
        .await?
        .ok_or(CatalogError::NotFound(id))?;
    Ok(Json(book))
}

async fn update_book(
    State(service): State<BookService>,
    id: Result<Path<BookId>, PathRejection>,
    payload: Result<Json<UpdateBook>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let id = book_id(id)?;
    let (changes, version) = body(payload)?.into_input()?;
    Ok(Json(service.update(id, changes, version).await?))
}

async fn delete_book(
    State(service): State<BookService>,
    id: Result<Path<BookId>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = book_id(id)?;
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
