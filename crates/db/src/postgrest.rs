//! Catalog store backed by a PostgREST endpoint (the REST face of Supabase).

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;

use crate::{Book, BookId, CatalogStore, Filter, NewBook, Select, SortOrder, StoreError};

const REST_PATH: &str = "rest/v1";
const RETURN_REPRESENTATION: &str = "return=representation";

#[derive(Clone)]
pub struct PostgrestStore {
    client: Client,
    table_url: String,
}

impl PostgrestStore {
    /// Builds a client for `{url}/rest/v1/{table}`.
    ///
    /// `api_key` is sent both as the `apikey` header and as a bearer token.
    pub fn new(url: &str, api_key: &str, table: &str, timeout: Duration) -> anyhow::Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing store API key");
        anyhow::ensure!(
            url.starts_with("http://") || url.starts_with("https://"),
            "store URL must be an http(s) URL"
        );
        anyhow::ensure!(!table.trim().is_empty(), "missing store table name");

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key.trim()).context("invalid store API key")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
                .context("invalid store API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build store HTTP client")?;

        Ok(Self {
            client,
            table_url: table_url(url, table),
        })
    }

    pub fn table_url(&self) -> &str {
        &self.table_url
    }
}

fn table_url(base: &str, table: &str) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), REST_PATH, table)
}

/// PostgREST horizontal filter, e.g. `("ranking", "gte.0")`.
fn filter_param(filter: &Filter) -> (&'static str, String) {
    match filter {
        Filter::Id(id) => ("id", format!("eq.{}", id)),
        Filter::RankingAtLeast(min) => ("ranking", format!("gte.{}", min)),
    }
}

fn select_params(query: &Select) -> Vec<(&'static str, String)> {
    let mut params = vec![("select", "*".to_string())];
    if let Some(filter) = &query.filter {
        params.push(filter_param(filter));
    }
    if query.order == SortOrder::RankingAscending {
        params.push(("order", "ranking.asc".to_string()));
    }
    params
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

async fn send(request: RequestBuilder) -> Result<Response, StoreError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    tracing::warn!(target: "shelf-db", status = %status, "postgrest request rejected");
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message: rejection_message(&body),
    })
}

fn rejection_message(body: &str) -> String {
    match serde_json::from_str::<ErrorPayload>(body) {
        Ok(ErrorPayload {
            message: Some(message),
            details,
        }) => match details {
            Some(details) if !details.is_empty() => format!("{} ({})", message, details),
            _ => message,
        },
        _ => body.to_string(),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| StoreError::Decode(err.to_string()))
}

#[async_trait]
impl CatalogStore for PostgrestStore {
    fn backend(&self) -> &'static str {
        "postgrest"
    }

    async fn select(&self, query: &Select) -> Result<Vec<Book>, StoreError> {
        let request = self
            .client
            .get(&self.table_url)
            .query(&select_params(query));
        decode(send(request).await?).await
    }

    async fn insert(&self, books: Vec<NewBook>) -> Result<Vec<Book>, StoreError> {
        if books.is_empty() {
            return Ok(Vec::new());
        }

        let request = self
            .client
            .post(&self.table_url)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&books);
        decode(send(request).await?).await
    }

    async fn update(&self, id: &BookId, book: NewBook) -> Result<Option<Book>, StoreError> {
        let request = self
            .client
            .patch(&self.table_url)
            .query(&[filter_param(&Filter::Id(id.clone()))])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&book);
        let rows: Vec<Book> = decode(send(request).await?).await?;
        Ok(rows.into_iter().next())
    }

    async fn delete(&self, filter: &Filter) -> Result<usize, StoreError> {
        let request = self
            .client
            .delete(&self.table_url)
            .query(&[filter_param(filter), ("select", "id".to_string())])
            .header("Prefer", RETURN_REPRESENTATION);
        let rows: Vec<IgnoredAny> = decode(send(request).await?).await?;
        Ok(rows.len())
    }
}
