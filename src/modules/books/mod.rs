pub mod error;
pub mod models;
pub mod routes;
pub mod service;
pub mod store;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use libris_db::Database;
use libris_kernel::{InitCtx, Module};
use serde_json::json;
use utoipa::PartialSchema;

use self::models::{Book, CreateBook, UpdateBook};
use self::service::BookService;
use self::store::{BookStore, InMemoryBookStore, SledBookStore};

/// The book catalog: CRUD over books with optimistic locking on update
pub struct BooksModule {
    service: BookService,
}

impl BooksModule {
    pub fn new(service: BookService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = ?ctx.settings.database.backend,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let books = self.service.list().await?.len();
        tracing::info!(module = self.name(), books, "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorBody" }
            }
        }
    })
}

fn book_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    })
}

fn json_body(schema: &str) -> serde_json::Value {
    json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{schema}") }
            }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let id_param = json!([{
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64", "minimum": 0 }
    }]);

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "All books in insertion order",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        },
                        "500": error_response("Internal server error")
                    }
                },
                "post": {
                    "summary": "Create book",
                    "tags": ["Books"],
                    "requestBody": json_body("CreateBook"),
                    "responses": {
                        "200": book_response("Book created"),
                        "400": error_response("Invalid input or ISBN already exists")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get book by id",
                    "tags": ["Books"],
                    "parameters": id_param.clone(),
                    "responses": {
                        "200": book_response("Book found"),
                        "404": error_response("Book not found")
                    }
                },
                "put": {
                    "summary": "Update book",
                    "description": "Replaces title, author, isbn and availability. `version` must equal the stored version.",
                    "tags": ["Books"],
                    "parameters": id_param.clone(),
                    "requestBody": json_body("UpdateBook"),
                    "responses": {
                        "200": book_response("Book updated"),
                        "400": error_response("Invalid input or ISBN already exists"),
                        "404": error_response("Book not found"),
                        "409": error_response("Version is stale")
                    }
                },
                "delete": {
                    "summary": "Delete book",
                    "tags": ["Books"],
                    "parameters": id_param,
                    "responses": {
                        "204": { "description": "Book deleted" },
                        "404": error_response("Book not found")
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": {
                                "text/plain": { "schema": { "type": "string" } }
                            }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": Book::schema(),
                "CreateBook": CreateBook::schema(),
                "UpdateBook": UpdateBook::schema()
            }
        }
    })
}

/// Build the store selected by the database handle
pub fn store_for(db: &Database) -> anyhow::Result<Arc<dyn BookStore>> {
    let store: Arc<dyn BookStore> = match db {
        Database::Memory => Arc::new(InMemoryBookStore::new()),
        Database::Sled(db) => Arc::new(SledBookStore::open(db.clone())?),
    };
    Ok(store)
}

/// Create a new instance of the books module backed by `db`
pub fn create_module(db: &Database) -> anyhow::Result<Arc<dyn Module>> {
    let service = BookService::new(store_for(db)?);
    Ok(Arc::new(BooksModule::new(service)))
}
