pub mod handlers;
pub mod models;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Module};
use serde_json::json;

use store::BookStore;

/// Books module: CRUD routes over the `books` collection.
pub struct BooksModule {
    store: Arc<dyn BookStore>,
}

impl BooksModule {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
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
        handlers::routes(self.store.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.store.close().await?;
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: serde_json::Value) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": { "schema": schema }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let id_param = json!({
        "name": "id",
        "in": "path",
        "required": true,
        "description": "24-character hex object id",
        "schema": { "type": "string" }
    });

    let paths = json!({
        "/": {
            "get": {
                "summary": "List books",
                "tags": ["Books"],
                "responses": {
                    "200": json_response("All books", json!({
                        "type": "object",
                        "properties": {
                            "data": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Book" }
                            }
                        }
                    })),
                    "500": error_response("Store failure")
                }
            },
            "post": {
                "summary": "Create a book",
                "tags": ["Books"],
                "requestBody": {
                    "required": true,
                    "content": {
                        "application/json": {
                            "schema": { "$ref": "#/components/schemas/CreateBook" }
                        }
                    }
                },
                "responses": {
                    "201": json_response("Book created", json!({
                        "type": "object",
                        "properties": {
                            "result": { "$ref": "#/components/schemas/InsertOutcome" }
                        }
                    })),
                    "400": error_response("Invalid body"),
                    "500": error_response("Failed to create book")
                }
            }
        },
        "/{id}": {
            "get": {
                "summary": "Get a book",
                "tags": ["Books"],
                "parameters": [id_param.clone()],
                "responses": {
                    "200": json_response("The book", json!({
                        "type": "object",
                        "properties": {
                            "data": { "$ref": "#/components/schemas/Book" }
                        }
                    })),
                    "400": error_response("Missing or invalid id"),
                    "404": error_response("No book with this id"),
                    "500": error_response("Store failure")
                }
            },
            "put": {
                "summary": "Partially update a book",
                "tags": ["Books"],
                "parameters": [id_param.clone()],
                "requestBody": {
                    "required": true,
                    "content": {
                        "application/json": {
                            "schema": { "$ref": "#/components/schemas/UpdateBook" }
                        }
                    }
                },
                "responses": {
                    "200": json_response("Update applied", json!({
                        "type": "object",
                        "properties": {
                            "result": { "$ref": "#/components/schemas/UpdateOutcome" }
                        }
                    })),
                    "400": error_response("Invalid id or body"),
                    "500": error_response("Failed to update book")
                }
            },
            "delete": {
                "summary": "Delete a book",
                "tags": ["Books"],
                "parameters": [id_param],
                "responses": {
                    "200": json_response("Delete applied", json!({
                        "type": "object",
                        "properties": {
                            "result": { "$ref": "#/components/schemas/DeleteOutcome" }
                        }
                    })),
                    "400": error_response("Missing or invalid id"),
                    "500": error_response("Failed to delete book")
                }
            }
        }
    });

    let schemas = json!({
        "Book": {
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Store-assigned object id" },
                "title": { "type": "string" },
                "author": { "type": "string" },
                "year": { "type": "string" }
            },
            "required": ["id", "title", "author", "year"]
        },
        "CreateBook": {
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "author": { "type": "string" },
                "year": { "type": "string" }
            }
        },
        "UpdateBook": {
            "type": "object",
            "description": "Only present, non-empty fields are written",
            "properties": {
                "title": { "type": "string" },
                "author": { "type": "string" },
                "year": { "type": "string" }
            }
        },
        "InsertOutcome": {
            "type": "object",
            "properties": { "inserted_id": { "type": "string" } },
            "required": ["inserted_id"]
        },
        "UpdateOutcome": {
            "type": "object",
            "properties": {
                "matched_count": { "type": "integer" },
                "modified_count": { "type": "integer" }
            },
            "required": ["matched_count", "modified_count"]
        },
        "DeleteOutcome": {
            "type": "object",
            "properties": { "deleted_count": { "type": "integer" } },
            "required": ["deleted_count"]
        }
    });

    json!({
        "paths": paths,
        "components": { "schemas": schemas }
    })
}

/// Create a new instance of the books module over `store`
pub fn create_module(store: Arc<dyn BookStore>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_kernel::{settings::Settings, ModuleRegistry};
    use super::store::MemoryBookStore;

    #[test]
    fn openapi_fragment_documents_all_operations() {
        let spec = openapi_fragment();
        let collection = &spec["paths"]["/"];
        let item = &spec["paths"]["/{id}"];

        assert!(collection.get("get").is_some());
        assert!(collection.get("post").is_some());
        for method in ["get", "put", "delete"] {
            assert!(item.get(method).is_some(), "missing {method}");
        }
    }

    #[test]
    fn merged_openapi_mounts_books_paths() {
        let mut registry = ModuleRegistry::new();
        registry.register(create_module(Arc::new(MemoryBookStore::new())));

        let merged = bookshelf_http::router::merged_openapi(&registry);
        assert!(merged["paths"].get("/books").is_some());
        assert!(merged["paths"].get("/books/{id}").is_some());
        assert!(merged["components"]["schemas"].get("Book").is_some());
    }

    #[tokio::test]
    async fn module_lifecycle_closes_store() {
        let mut registry = ModuleRegistry::new();
        registry.register(create_module(Arc::new(MemoryBookStore::new())));

        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
        };
        registry.init_all(&ctx).await.unwrap();
        registry.start_all(&ctx).await.unwrap();
        registry.stop_all().await.unwrap();
    }
}
