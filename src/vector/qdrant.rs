//! Qdrant REST client.

use super::{Distance, Filter, Payload, Point, ScoredPoint, VectorIndex};
use crate::error::{Error, Result};
use crate::http::{build_client, send_with_retry, HttpFailure, RetryPolicy};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

pub struct QdrantIndex {
    client: reqwest::Client,
    policy: RetryPolicy,
    base_url: String,
    api_key: Option<String>,
}

impl QdrantIndex {
    /// Create a client for the Qdrant server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `Http` if the client cannot be built.
    pub fn new(base_url: &str, api_key: Option<String>, policy: RetryPolicy) -> Result<Self> {
        Ok(Self {
            client: build_client(&policy)?,
            policy,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn send(
        &self,
        op: &str,
        method: reqwest::Method,
        url: &str,
        body: Option<&Value>,
    ) -> std::result::Result<reqwest::Response, HttpFailure> {
        send_with_retry(op, &self.policy, || {
            let builder = self.request(method.clone(), url);
            match body {
                Some(body) => builder.json(body),
                None => builder,
            }
        })
        .await
    }
}

fn index_error(op: &str, failure: &HttpFailure) -> Error {
    Error::VectorIndex(format!("Qdrant {op} failed: {failure}"))
}

#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ExistsResult {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Payload>,
}

fn filter_body(filter: &Filter) -> Value {
    let must: Vec<Value> = filter
        .must
        .iter()
        .map(|(key, value)| json!({ "key": key, "match": { "value": value } }))
        .collect();
    json!({ "must": must })
}

fn search_body(vector: &[f32], filter: Option<&Filter>, limit: usize) -> Value {
    let mut body = json!({
        "vector": vector,
        "limit": limit,
        "with_payload": true,
    });
    if let Some(filter) = filter {
        body["filter"] = filter_body(filter);
    }
    body
}

fn points_body(points: &[Point]) -> Value {
    let points: Vec<Value> = points
        .iter()
        .map(|p| {
            json!({
                "id": p.id.to_string(),
                "vector": p.vector,
                "payload": p.payload,
            })
        })
        .collect();
    json!({ "points": points })
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        let url = self.url(&format!("/collections/{collection}/exists"));
        let response = self
            .send("collection_exists", reqwest::Method::GET, &url, None)
            .await
            .map_err(|e| index_error("collection_exists", &e))?;
        let data: QdrantResponse<ExistsResult> = response.json().await?;
        Ok(data.result.exists)
    }

    async fn create_collection(
        &self,
        collection: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<()> {
        let url = self.url(&format!("/collections/{collection}"));
        let distance = match distance {
            Distance::Cosine => "Cosine",
        };
        let body = json!({ "vectors": { "size": dimensions, "distance": distance } });

        match self
            .send("create_collection", reqwest::Method::PUT, &url, Some(&body))
            .await
        {
            Ok(_) => Ok(()),
            // Another writer created it first
            Err(e) if e.status() == Some(409) => Ok(()),
            Err(e) => Err(index_error("create_collection", &e)),
        }
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        let url = self.url(&format!("/collections/{collection}/points?wait=true"));
        let body = points_body(&points);
        self.send("upsert", reqwest::Method::PUT, &url, Some(&body))
            .await
            .map_err(|e| index_error("upsert", &e))?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let url = self.url(&format!("/collections/{collection}/points/search"));
        let body = search_body(vector, filter, limit);
        let response = self
            .send("search", reqwest::Method::POST, &url, Some(&body))
            .await
            .map_err(|e| index_error("search", &e))?;

        let data: QdrantResponse<Vec<SearchHit>> = response.json().await?;
        let hits = data
            .result
            .into_iter()
            .filter_map(|hit| {
                // Points written by other tools may use integer ids
                let id = hit.id.as_str().and_then(|s| Uuid::parse_str(s).ok())?;
                Some(ScoredPoint {
                    id,
                    score: hit.score,
                    payload: hit.payload.unwrap_or_default(),
                })
            })
            .collect();
        Ok(hits)
    }

    async fn delete(&self, collection: &str, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let url = self.url(&format!("/collections/{collection}/points/delete?wait=true"));
        let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        let body = json!({ "points": ids });

        match self
            .send("delete", reqwest::Method::POST, &url, Some(&body))
            .await
        {
            Ok(_) => Ok(()),
            // No collection means no points to remove
            Err(e) if e.status() == Some(404) => Ok(()),
            Err(e) => Err(index_error("delete", &e)),
        }
    }
}
