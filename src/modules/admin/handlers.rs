use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shelf_authz::{bearer_token, AdminAuth};
use shelf_db::{Book, BookId, CatalogStore, Filter, NewBook, Select};
use shelf_http::AppError;

pub type Store = Arc<dyn CatalogStore>;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in_secs: u64,
}

pub async fn login(
    State(auth): State<Arc<AdminAuth>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(request) = payload?;
    let session = auth.login(&request.password)?;
    Ok(Json(LoginResponse {
        token: session.token,
        token_type: "Bearer".to_string(),
        expires_in_secs: session.expires_in.as_secs(),
    }))
}

pub async fn logout(
    State(auth): State<Arc<AdminAuth>>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token =
        bearer_token(&headers).ok_or_else(|| AppError::unauthorized("missing bearer token"))?;
    auth.logout(token);
    Ok(StatusCode::NO_CONTENT)
}

fn validate(book: &NewBook) -> Result<(), AppError> {
    let invalid = book.invalid_fields();
    if invalid.is_empty() {
        return Ok(());
    }

    let details = invalid
        .iter()
        .map(|(field, error)| json!({ "field": field, "error": error }))
        .collect();
    let summary: Vec<_> = invalid
        .iter()
        .map(|(field, error)| format!("{} {}", field, error))
        .collect();
    Err(AppError::validation(
        details,
        format!("invalid book: {}", summary.join(", ")),
    ))
}

pub async fn list_books(State(store): State<Store>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(store.select(&Select::all().by_ranking()).await?))
}

pub async fn create_book(
    State(store): State<Store>,
    payload: Result<Json<NewBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(book) = payload?;
    validate(&book)?;

    let stored = store
        .insert(vec![book])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("store returned no row for the inserted book"))?;

    tracing::info!(id = %stored.id, ranking = stored.ranking, "book created");
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn update_book(
    State(store): State<Store>,
    Path(id): Path<String>,
    payload: Result<Json<NewBook>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Json(book) = payload?;
    validate(&book)?;
    let id = BookId::new(id);

    match store.update(&id, book).await? {
        Some(updated) => {
            tracing::info!(id = %updated.id, "book updated");
            Ok(Json(updated))
        }
        None => Err(AppError::not_found(format!("book {} not found", id))),
    }
}

pub async fn delete_book(
    State(store): State<Store>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = BookId::new(id);
    let matched = store.delete(&Filter::Id(id.clone())).await?;
    tracing::info!(%id, matched, "book delete requested");
    Ok(StatusCode::NO_CONTENT)
}
