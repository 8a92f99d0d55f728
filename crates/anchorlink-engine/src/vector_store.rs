//! Qdrant vector store client for chunk embedding reads.
//!
//! This core never writes to the store: ingestion collaborators own the
//! collection. The only operations here are payload-filtered scrolls that
//! return vectors — article chunks by `article_id`, knowledge-base chunks by
//! `source_location`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::EngineError;

/// Points fetched per scroll page.
const SCROLL_PAGE_SIZE: usize = 256;

/// Qdrant HTTP client, read-only.
pub struct VectorStoreClient {
    client: reqwest::Client,
    base_url: String,
    collection: String,
}

#[derive(Serialize)]
struct ScrollRequest {
    filter: Filter,
    limit: usize,
    with_payload: bool,
    with_vector: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<Value>,
}

#[derive(Serialize)]
struct Filter {
    must: Vec<FieldMatch>,
}

#[derive(Serialize)]
struct FieldMatch {
    key: String,
    r#match: MatchValue,
}

#[derive(Serialize)]
struct MatchValue {
    value: Value,
}

#[derive(Deserialize)]
struct ScrollResponse {
    result: ScrollResult,
}

#[derive(Deserialize)]
struct ScrollResult {
    points: Vec<ScrollPoint>,
    next_page_offset: Option<Value>,
}

#[derive(Deserialize)]
struct ScrollPoint {
    vector: Option<Vec<f32>>,
}

impl VectorStoreClient {
    /// Create a new client against one collection.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Http`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(
        base_url: &str,
        collection: &str,
        request_timeout_secs: u64,
    ) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
        })
    }

    /// Fetch every chunk vector belonging to one article.
    ///
    /// An article with no indexed chunks returns an empty set; the scorer
    /// defines that as score zero, so this is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Http`] on transport failure or
    /// [`EngineError::VectorStore`] on an API-level failure.
    pub async fn article_vectors(&self, article_id: i64) -> Result<Vec<Vec<f32>>, EngineError> {
        self.scroll_by_field("article_id", Value::from(article_id))
            .await
    }

    /// Fetch every chunk vector stored under one knowledge-base location.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Http`] on transport failure or
    /// [`EngineError::VectorStore`] on an API-level failure.
    pub async fn location_vectors(
        &self,
        source_location: &str,
    ) -> Result<Vec<Vec<f32>>, EngineError> {
        self.scroll_by_field("source_location", Value::from(source_location))
            .await
    }

    /// Scroll all points whose payload field equals `value`, following
    /// pagination until the store reports no next page.
    async fn scroll_by_field(
        &self,
        field: &str,
        value: Value,
    ) -> Result<Vec<Vec<f32>>, EngineError> {
        let url = format!(
            "{}/collections/{}/points/scroll",
            self.base_url, self.collection
        );

        let mut vectors = Vec::new();
        let mut offset: Option<Value> = None;

        loop {
            let request = ScrollRequest {
                filter: Filter {
                    must: vec![FieldMatch {
                        key: field.to_string(),
                        r#match: MatchValue {
                            value: value.clone(),
                        },
                    }],
                },
                limit: SCROLL_PAGE_SIZE,
                with_payload: false,
                with_vector: true,
                offset: offset.take(),
            };

            let response = self.client.post(&url).json(&request).send().await?;

            if !response.status().is_success() {
                return Err(EngineError::VectorStore(format!(
                    "scroll on {field} returned status {}",
                    response.status()
                )));
            }

            let page: ScrollResponse = response.json().await.map_err(|e| {
                EngineError::VectorStore(format!("scroll response parse error: {e}"))
            })?;

            vectors.extend(page.result.points.into_iter().filter_map(|p| p.vector));

            match page.result.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(vectors)
    }
}
