//! Similarity store adapters.
//!
//! The store keeps exactly one index entry per listing and answers nearest-
//! neighbour queries above a threshold. It is a thin seam so the backing
//! engine can be swapped without touching the maintainer or the query
//! service:
//!
//! - `RestStore`: PostgREST-style interface: upsert into the index table,
//!   similarity via a store-side match procedure
//! - `MemoryStore`: in-process map with a cosine-similarity scan, for tests
//!   and local runs

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::StoreConfig;
use crate::semantic::codec;

/// One persisted index entry, keyed by `listing_id`.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub listing_id: u64,
    /// Denormalized reference code, returned as the result key.
    pub listing_ref: String,
    /// The exact string that was embedded, kept for auditability.
    pub canonical_text: String,
    pub embedding: Vec<f32>,
    pub updated_at: DateTime<Utc>,
}

/// One row returned by the similarity query.
#[derive(Debug, Clone)]
pub struct SimilarityRow {
    pub reference: String,
    pub similarity: f32,
}

/// Errors crossing the store boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The match procedure or index table is not installed/reachable.
    #[error("similarity operation is not installed")]
    RpcMissing,

    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("store returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("store response is malformed: {0}")]
    BadResponse(String),
}

/// Persistence seam for the semantic index.
pub trait SimilarityStore: Send + Sync {
    /// Insert or fully replace the entry for `entry.listing_id`.
    /// Last write wins; there is no merge.
    fn upsert(&self, entry: &IndexEntry) -> Result<(), StoreError>;

    /// Rows with similarity >= `min_similarity`, at most `limit`, in
    /// descending similarity order with a deterministic tie order.
    fn query(
        &self,
        embedding: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<SimilarityRow>, StoreError>;
}

/// Store adapter over a PostgREST-style interface.
pub struct RestStore {
    base_url: String,
    service_key: String,
    index_table: String,
    match_function: String,
    client: reqwest::blocking::Client,
}

impl RestStore {
    /// Build the adapter, or `None` when base URL or credential is missing.
    pub fn new(config: &StoreConfig) -> Option<Self> {
        let base_url = config.base_url.clone()?;
        let service_key = config.service_key.clone()?;
        if service_key.is_empty() {
            return None;
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .ok()?;

        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            index_table: config.index_table.clone(),
            match_function: config.match_function.clone(),
            client,
        })
    }

    fn auth(&self, req: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        req.header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
    }

    fn parse_rows(body: &Value) -> Result<Vec<SimilarityRow>, StoreError> {
        let rows = body
            .as_array()
            .ok_or_else(|| StoreError::BadResponse("expected an array of rows".to_string()))?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let reference = row.get("ref").and_then(|v| v.as_str())?;
                let similarity = row
                    .get("similarity")
                    .or_else(|| row.get("score"))
                    .and_then(|v| v.as_f64())?;

                Some(SimilarityRow {
                    reference: reference.to_string(),
                    similarity: similarity as f32,
                })
            })
            .collect())
    }
}

impl SimilarityStore for RestStore {
    fn upsert(&self, entry: &IndexEntry) -> Result<(), StoreError> {
        let url = format!("{}/rest/v1/{}", self.base_url, self.index_table);

        let payload = serde_json::json!({
            "listing_id": entry.listing_id,
            "listing_ref": entry.listing_ref,
            "canonical_text": entry.canonical_text,
            "embedding": codec::encode(&entry.embedding),
            "updated_at": entry.updated_at.to_rfc3339(),
        });

        let resp = self
            .auth(self.client.post(&url))
            .query(&[("on_conflict", "listing_id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&payload)
            .send()?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::RpcMissing);
        }
        if !status.is_success() {
            return Err(StoreError::Status(status));
        }

        Ok(())
    }

    fn query(
        &self,
        embedding: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<SimilarityRow>, StoreError> {
        let url = format!(
            "{}/rest/v1/rpc/{}",
            self.base_url, self.match_function
        );

        let payload = serde_json::json!({
            "query_embedding_text": codec::encode(embedding),
            "match_count": limit,
            "min_similarity": min_similarity,
        });

        let resp = self.auth(self.client.post(&url)).json(&payload).send()?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::RpcMissing);
        }
        if !status.is_success() {
            return Err(StoreError::Status(status));
        }

        let body = resp
            .json::<Value>()
            .map_err(|err| StoreError::BadResponse(err.to_string()))?;

        Self::parse_rows(&body)
    }
}

/// In-process store with a cosine-similarity scan.
#[allow(dead_code)]
pub struct MemoryStore {
    entries: Mutex<HashMap<u64, IndexEntry>>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the entry for a listing, if present.
    pub fn get(&self, listing_id: u64) -> Option<IndexEntry> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(&listing_id).cloned())
    }

    fn l2_norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    fn cosine_similarity(query: &[f32], target: &[f32], query_norm: f32) -> f32 {
        let target_norm = Self::l2_norm(target);
        if target_norm < f32::EPSILON || query_norm < f32::EPSILON {
            return 0.0;
        }

        let dot: f32 = query.iter().zip(target.iter()).map(|(a, b)| a * b).sum();
        dot / (query_norm * target_norm)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityStore for MemoryStore {
    fn upsert(&self, entry: &IndexEntry) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::BadResponse("store lock poisoned".to_string()))?;

        entries.insert(entry.listing_id, entry.clone());
        Ok(())
    }

    fn query(
        &self,
        embedding: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<SimilarityRow>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::BadResponse("store lock poisoned".to_string()))?;

        let query_norm = Self::l2_norm(embedding);

        let mut rows: Vec<(u64, SimilarityRow)> = entries
            .values()
            .filter_map(|entry| {
                let similarity =
                    Self::cosine_similarity(embedding, &entry.embedding, query_norm);
                if similarity >= min_similarity {
                    Some((
                        entry.listing_id,
                        SimilarityRow {
                            reference: entry.listing_ref.clone(),
                            similarity,
                        },
                    ))
                } else {
                    None
                }
            })
            .collect();

        // Descending by similarity, listing id as the deterministic tiebreak
        rows.sort_by(|(id_a, a), (id_b, b)| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(id_a.cmp(id_b))
        });
        rows.truncate(limit);

        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }
}
