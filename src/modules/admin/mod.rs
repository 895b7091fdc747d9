pub mod handlers;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use serde_json::json;
use shelf_authz::{require_session, AdminAuth};
use shelf_db::CatalogStore;
use shelf_kernel::{InitCtx, Module};

/// Catalog administration behind an admin session.
pub struct AdminModule {
    store: Arc<dyn CatalogStore>,
    auth: Arc<AdminAuth>,
}

impl AdminModule {
    pub fn new(store: Arc<dyn CatalogStore>, auth: Arc<AdminAuth>) -> Self {
        Self { store, auth }
    }
}

#[async_trait]
impl Module for AdminModule {
    fn name(&self) -> &'static str {
        "admin"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            login_enabled = self.auth.is_enabled(),
            "admin module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        let books = Router::new()
            .route(
                "/books",
                get(handlers::list_books).post(handlers::create_book),
            )
            .route(
                "/books/{id}",
                put(handlers::update_book).delete(handlers::delete_book),
            )
            .with_state(Arc::clone(&self.store))
            .route_layer(middleware::from_fn_with_state(
                Arc::clone(&self.auth),
                require_session,
            ));

        Router::new()
            .route("/login", post(handlers::login))
            .route("/logout", post(handlers::logout))
            .with_state(Arc::clone(&self.auth))
            .merge(books)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book = json!({
            "description": "Stored book",
            "content": {
                "application/json": { "schema": { "$ref": "#/components/schemas/Book" } }
            }
        });
        let new_book = json!({
            "required": true,
            "content": {
                "application/json": { "schema": { "$ref": "#/components/schemas/NewBook" } }
            }
        });
        let bearer = json!([{ "bearerAuth": [] }]);
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        });

        Some(json!({
            "paths": {
                "/login": {
                    "post": {
                        "summary": "Exchange the admin password for a session token",
                        "tags": ["Admin"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": { "password": { "type": "string" } },
                                        "required": ["password"]
                                    }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Session issued",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/AdminSession" }
                                    }
                                }
                            },
                            "401": error("Wrong password or admin login disabled")
                        }
                    }
                },
                "/logout": {
                    "post": {
                        "summary": "Revoke the current session token",
                        "tags": ["Admin"],
                        "security": bearer,
                        "responses": { "204": { "description": "Revoked" } }
                    }
                },
                "/books": {
                    "get": {
                        "summary": "List the catalog, best ranked first",
                        "tags": ["Admin"],
                        "security": bearer,
                        "responses": {
                            "200": {
                                "description": "All books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "401": error("No live admin session")
                        }
                    },
                    "post": {
                        "summary": "Add a book",
                        "tags": ["Admin"],
                        "security": bearer,
                        "requestBody": new_book,
                        "responses": {
                            "201": book,
                            "401": error("No live admin session"),
                            "422": error("Title or author missing")
                        }
                    }
                },
                "/books/{id}": {
                    "put": {
                        "summary": "Replace a book's fields",
                        "tags": ["Admin"],
                        "security": bearer,
                        "parameters": [id_param],
                        "requestBody": new_book,
                        "responses": {
                            "200": book,
                            "401": error("No live admin session"),
                            "404": error("No book with this id"),
                            "422": error("Title or author missing")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book; unknown ids are not an error",
                        "tags": ["Admin"],
                        "security": bearer,
                        "parameters": [id_param],
                        "responses": {
                            "204": { "description": "Deleted or already absent" },
                            "401": error("No live admin session")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "cover_image_url": { "type": "string", "nullable": true },
                            "synopsis": { "type": "string", "nullable": true },
                            "purchase_link": { "type": "string", "nullable": true },
                            "ranking": { "type": "integer" }
                        },
                        "required": ["id", "title", "author", "ranking"]
                    },
                    "NewBook": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "cover_image_url": { "type": "string", "nullable": true },
                            "synopsis": { "type": "string", "nullable": true },
                            "purchase_link": { "type": "string", "nullable": true },
                            "ranking": { "type": "integer", "default": shelf_db::UNRANKED }
                        },
                        "required": ["title", "author"]
                    },
                    "AdminSession": {
                        "type": "object",
                        "properties": {
                            "token": { "type": "string" },
                            "token_type": { "type": "string" },
                            "expires_in_secs": { "type": "integer" }
                        },
                        "required": ["token", "token_type", "expires_in_secs"]
                    }
                },
                "securitySchemes": {
                    "bearerAuth": { "type": "http", "scheme": "bearer" }
                }
            }
        }))
    }
}

pub fn create_module(store: Arc<dyn CatalogStore>, auth: Arc<AdminAuth>) -> Arc<dyn Module> {
    Arc::new(AdminModule::new(store, auth))
}
