//! Rakuten Books ranking feed client.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shelf_db::NewBook;
use shelf_kernel::settings::FeedSettings;
use thiserror::Error;

/// Query suffix the feed appends to cover URLs to request a thumbnail.
pub const THUMBNAIL_SUFFIX: &str = "?_ex=120x120";

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("feed application id is not configured; set RAKUTEN_APP_ID")]
    MissingCredential,

    #[error("feed request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("feed request failed with status {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("failed to decode feed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("feed item ranked {rank} is invalid: {reason}")]
    InvalidItem { rank: i32, reason: String },
}

/// One entry of the ranking feed, already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub author: String,
    pub cover_image_url: String,
    pub caption: String,
    pub item_url: String,
    pub rank: i32,
}

impl FeedItem {
    pub fn into_new_book(self) -> NewBook {
        NewBook {
            title: self.title,
            author: self.author,
            cover_image_url: non_empty(self.cover_image_url),
            synopsis: non_empty(self.caption),
            purchase_link: non_empty(self.item_url),
            ranking: self.rank,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Anything that can produce the current feed snapshot.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError>;
}

/// Drop the thumbnail size query so the full-resolution cover is used.
pub fn normalize_cover_url(url: &str) -> String {
    url.replacen(THUMBNAIL_SUFFIX, "", 1)
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "Items")]
    items: Vec<ItemEnvelope>,
}

#[derive(Debug, Deserialize)]
struct ItemEnvelope {
    #[serde(rename = "Item")]
    item: RawItem,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    large_image_url: String,
    #[serde(default)]
    item_caption: String,
    #[serde(default)]
    item_url: String,
    #[serde(default)]
    rank: Option<i32>,
}

/// Parse a search response body. Items without a `rank` are ranked by position.
pub fn parse_feed(body: &[u8]) -> Result<Vec<FeedItem>, FeedError> {
    let response: SearchResponse = serde_json::from_slice(body)?;

    Ok(response
        .items
        .into_iter()
        .enumerate()
        .map(|(position, ItemEnvelope { item })| FeedItem {
            cover_image_url: normalize_cover_url(&item.large_image_url),
            title: item.title,
            author: item.author,
            caption: item.item_caption,
            item_url: item.item_url,
            rank: item
                .rank
                .unwrap_or_else(|| i32::try_from(position + 1).unwrap_or(i32::MAX)),
        })
        .collect())
}

/// Calls the BooksTotal search endpoint for one fixed genre.
pub struct RakutenFeed {
    client: Client,
    endpoint: String,
    genre_id: String,
    application_id: Option<String>,
}

impl RakutenFeed {
    pub fn new(settings: &FeedSettings) -> anyhow::Result<Self> {
        anyhow::ensure!(
            settings.endpoint.starts_with("http://") || settings.endpoint.starts_with("https://"),
            "feed endpoint must be an http(s) URL"
        );
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .context("failed to build feed HTTP client")?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            genre_id: settings.genre_id.clone(),
            application_id: settings
                .application_id
                .as_ref()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        })
    }
}

#[async_trait]
impl FeedSource for RakutenFeed {
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError> {
        let application_id = self
            .application_id
            .as_deref()
            .ok_or(FeedError::MissingCredential)?;

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("format", "json"),
                ("booksGenreId", self.genre_id.as_str()),
                ("applicationId", application_id),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let body = response.bytes().await?;
        let items = parse_feed(&body)?;
        tracing::debug!(target: "shelf::sync", items = items.len(), "feed fetched");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbnail_suffix_is_stripped() {
        let thumbnail =
            "https://thumbnail.image.rakuten.co.jp/0_mall/book/cabinet/1.jpg?_ex=120x120";
        assert_eq!(
            normalize_cover_url(thumbnail),
            "https://thumbnail.image.rakuten.co.jp/0_mall/book/cabinet/1.jpg"
        );
    }

    #[test]
    fn urls_without_suffix_pass_through() {
        assert_eq!(normalize_cover_url("http://i/1"), "http://i/1");
        assert_eq!(normalize_cover_url("http://i/1?_ex=200x200"), "http://i/1?_ex=200x200");
        assert_eq!(normalize_cover_url(""), "");
    }

    #[test]
    fn parses_items_in_feed_order() {
        let body = br#"{
            "count": 2,
            "Items": [
                {"Item": {"title": "A", "author": "X", "rank": 1,
                          "largeImageUrl": "http://i/1?_ex=120x120",
                          "itemCaption": "c", "itemUrl": "http://buy/1"}},
                {"Item": {"title": "B", "author": "Y", "rank": 2,
                          "largeImageUrl": "http://i/2",
                          "itemCaption": "", "itemUrl": "http://buy/2",
                          "isbn": "9784000000000"}}
            ]
        }"#;

        let items = parse_feed(body).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0],
            FeedItem {
                title: "A".to_string(),
                author: "X".to_string(),
                cover_image_url: "http://i/1".to_string(),
                caption: "c".to_string(),
                item_url: "http://buy/1".to_string(),
                rank: 1,
            }
        );
        assert_eq!(items[1].cover_image_url, "http://i/2");
    }

    #[test]
    fn missing_rank_falls_back_to_position() {
        let body = br#"{"Items": [
            {"Item": {"title": "A", "author": "X"}},
            {"Item": {"title": "B", "author": "Y"}}
        ]}"#;

        let ranks: Vec<_> = parse_feed(body).unwrap().iter().map(|i| i.rank).collect();
        assert_eq!(ranks, vec![1, 2]);
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        assert!(matches!(parse_feed(b"<html>"), Err(FeedError::Decode(_))));
        assert!(matches!(
            parse_feed(br#"{"error": "wrong_parameter"}"#),
            Err(FeedError::Decode(_))
        ));
    }

    #[test]
    fn blank_fields_become_absent_on_the_record() {
        let item = FeedItem {
            title: "A".to_string(),
            author: "X".to_string(),
            cover_image_url: String::new(),
            caption: " ".to_string(),
            item_url: "http://buy/1".to_string(),
            rank: 4,
        };
        let book = item.into_new_book();

        assert!(book.cover_image_url.is_none());
        assert!(book.synopsis.is_none());
        assert_eq!(book.purchase_link.as_deref(), Some("http://buy/1"));
        assert_eq!(book.ranking, 4);
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_request() {
        let settings = FeedSettings {
            // Unroutable on purpose: reaching the network would surface as Transport.
            endpoint: "http://127.0.0.1:9/".to_string(),
            application_id: Some("   ".to_string()),
            ..FeedSettings::default()
        };
        let feed = RakutenFeed::new(&settings).unwrap();

        assert!(matches!(feed.fetch().await, Err(FeedError::MissingCredential)));
    }

    mod served {
        use super::*;
        use axum::{extract::State, http::StatusCode, http::Uri, routing::get, Router};
        use std::sync::{Arc, Mutex};

        #[derive(Clone)]
        struct Canned {
            status: StatusCode,
            body: &'static str,
            queries: Arc<Mutex<Vec<String>>>,
        }

        async fn answer(State(canned): State<Canned>, uri: Uri) -> (StatusCode, &'static str) {
            let query = uri.query().unwrap_or_default().to_string();
            canned.queries.lock().unwrap().push(query);
            (canned.status, canned.body)
        }

        /// Feed client pointed at a local endpoint answering every search the same way.
        async fn feed_answering(
            status: StatusCode,
            body: &'static str,
        ) -> (RakutenFeed, Arc<Mutex<Vec<String>>>) {
            let queries = Arc::new(Mutex::new(Vec::new()));
            let app = Router::new().route("/search", get(answer)).with_state(Canned {
                status,
                body,
                queries: queries.clone(),
            });
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let endpoint = format!("http://{}/search", listener.local_addr().unwrap());
            tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

            let settings = FeedSettings {
                endpoint,
                application_id: Some("app-1".to_string()),
                ..FeedSettings::default()
            };
            (RakutenFeed::new(&settings).unwrap(), queries)
        }

        #[tokio::test]
        async fn fetch_sends_genre_and_credential() {
            let body = r#"{"Items": [{"Item": {"title": "A", "author": "X", "rank": 1}}]}"#;
            let (feed, queries) = feed_answering(StatusCode::OK, body).await;

            let items = feed.fetch().await.unwrap();

            assert_eq!(items.len(), 1);
            assert_eq!(items[0].title, "A");
            let queries = queries.lock().unwrap();
            assert_eq!(queries.len(), 1);
            assert!(queries[0].contains("format=json"));
            assert!(queries[0].contains("booksGenreId=001004"));
            assert!(queries[0].contains("applicationId=app-1"));
        }

        #[tokio::test]
        async fn non_success_status_is_reported_with_reason() {
            let (feed, _) = feed_answering(StatusCode::SERVICE_UNAVAILABLE, "busy").await;

            match feed.fetch().await {
                Err(FeedError::Status { status, reason }) => {
                    assert_eq!(status, 503);
                    assert_eq!(reason, "Service Unavailable");
                }
                other => panic!("expected status error, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn html_body_is_a_decode_error() {
            let (feed, _) = feed_answering(StatusCode::OK, "<html>login</html>").await;

            assert!(matches!(feed.fetch().await, Err(FeedError::Decode(_))));
        }
    }
}
