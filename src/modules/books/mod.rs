pub mod models;
pub mod picker;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;
use shelf_db::{CatalogStore, Select};
use shelf_http::AppError;
use shelf_kernel::{InitCtx, Migration, Module};

use models::BookCard;

/// Public read surface: the catalog and a random handful from it.
pub struct BooksModule {
    store: Arc<dyn CatalogStore>,
}

impl BooksModule {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
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
            backend = self.store.backend(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_books))
            .route("/picks", get(pick_books))
            .with_state(Arc::clone(&self.store))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List the catalog, best ranked first",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "All books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/BookCard" }
                                        }
                                    }
                                }
                            },
                            "500": {
                                "description": "Store failure",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/picks": {
                    "get": {
                        "summary": "Three random books",
                        "description": concat!(
                            "Unweighted sample without replacement; ",
                            "fewer when the catalog is smaller."
                        ),
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Up to three books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "maxItems": picker::PICK_COUNT,
                                            "items": { "$ref": "#/components/schemas/BookCard" }
                                        }
                                    }
                                }
                            },
                            "500": {
                                "description": "Store failure",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "BookCard": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "cover_image_url": {
                                "type": "string",
                                "description": "Placeholder image when the book has no cover"
                            },
                            "synopsis": { "type": "string", "nullable": true },
                            "purchase_link": { "type": "string" },
                            "ranking": { "type": "integer" }
                        },
                        "required": ["id", "title", "author", "cover_image_url", "ranking"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id              BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
                    title           TEXT    NOT NULL CHECK (title <> ''),
                    author          TEXT    NOT NULL CHECK (author <> ''),
                    cover_image_url TEXT,
                    synopsis        TEXT,
                    purchase_link   TEXT,
                    ranking         INTEGER NOT NULL DEFAULT 51 CHECK (ranking >= 0)
                );
                CREATE INDEX IF NOT EXISTS books_ranking_idx ON books (ranking);
                "#,
        }]
    }
}

async fn list_books(
    State(store): State<Arc<dyn CatalogStore>>,
) -> Result<Json<Vec<BookCard>>, AppError> {
    let books = store.select(&Select::all().by_ranking()).await?;
    Ok(Json(books.into_iter().map(BookCard::from).collect()))
}

async fn pick_books(
    State(store): State<Arc<dyn CatalogStore>>,
) -> Result<Json<Vec<BookCard>>, AppError> {
    let books = store.select(&Select::all()).await?;
    let picks = picker::pick(&books, picker::PICK_COUNT, &mut rand::thread_rng());
    tracing::debug!(
        catalog = books.len(),
        picked = picks.len(),
        "books picked"
    );
    Ok(Json(picks.into_iter().map(BookCard::from).collect()))
}

pub fn create_module(store: Arc<dyn CatalogStore>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::Request, http::StatusCode};
    use shelf_db::{MemoryStore, NewBook};
    use std::collections::HashSet;
    use tower::ServiceExt;

    fn five_books() -> Arc<dyn CatalogStore> {
        Arc::new(MemoryStore::seeded(
            (1..=5).map(|n| NewBook::new(format!("Book {}", n), "Author", 6 - n)),
        ))
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn listing_is_ordered_by_ranking() {
        let module = BooksModule::new(five_books());
        let (status, body) = get_json(module.routes(), "/").await;

        assert_eq!(status, StatusCode::OK);
        let rankings: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["ranking"].as_i64().unwrap())
            .collect();
        assert_eq!(rankings, vec![1, 2, 3, 4, 5]);
        assert_eq!(body[0]["cover_image_url"], models::PLACEHOLDER_COVER);
    }

    #[tokio::test]
    async fn picks_are_three_distinct_catalog_books() {
        let module = BooksModule::new(five_books());

        for _ in 0..20 {
            let (status, body) = get_json(module.routes(), "/picks").await;
            assert_eq!(status, StatusCode::OK);

            let ids: HashSet<_> = body
                .as_array()
                .unwrap()
                .iter()
                .map(|b| b["id"].as_str().unwrap().to_string())
                .collect();
            assert_eq!(ids.len(), 3);
            assert!(ids
                .iter()
                .all(|id| ["1", "2", "3", "4", "5"].contains(&id.as_str())));
        }
    }

    #[tokio::test]
    async fn picks_from_empty_catalog_is_empty() {
        let module = BooksModule::new(Arc::new(MemoryStore::new()));
        let (status, body) = get_json(module.routes(), "/picks").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[test]
    fn migration_creates_books_table() {
        let migrations = BooksModule::new(Arc::new(MemoryStore::new())).migrations();
        assert_eq!(migrations.len(), 1);
        assert!(migrations[0].up.contains("CREATE TABLE IF NOT EXISTS books"));
        assert!(migrations[0].up.contains("DEFAULT 51"));
    }
}
