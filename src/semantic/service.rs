//! Listing search with multi-stage degradation.
//!
//! Every branch returns a value; nothing throws across this boundary. A
//! disabled outcome carries a typed reason so callers can fall back to a
//! simpler ranking method instead of surfacing an error.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::SearchConfig;
use crate::semantic::store::SimilarityStore;
use crate::semantic::{Embedder, MAX_MATCH_COUNT, MIN_QUERY_CHARS};

/// Why semantic search is disabled for a given request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabledReason {
    /// Normalized query is below the minimum length; no network cost.
    QueryTooShort,
    /// Provider not configured, timed out, or returned an unusable vector.
    EmbeddingUnavailable,
    /// The store adapter could not be constructed (missing configuration).
    StoreUnavailable,
    /// The similarity operation itself failed or is not installed.
    RpcUnavailable,
}

/// One ranked result, score normalized into [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "ref")]
    pub reference: String,
    pub score: f32,
}

/// Result envelope for one search request.
///
/// `enabled: false` means "no semantic ranking available right now", never a
/// hard error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DisabledReason>,
    pub results: Vec<SearchResult>,
}

impl SearchOutcome {
    fn disabled(reason: DisabledReason) -> Self {
        Self {
            enabled: false,
            reason: Some(reason),
            results: Vec::new(),
        }
    }
}

/// Answers free-text similarity queries over the listing index.
pub struct QueryService {
    embeddings: Arc<dyn Embedder>,
    store: Option<Arc<dyn SimilarityStore>>,
    defaults: SearchConfig,
}

impl QueryService {
    pub fn new(
        embeddings: Arc<dyn Embedder>,
        store: Option<Arc<dyn SimilarityStore>>,
        defaults: SearchConfig,
    ) -> Self {
        Self {
            embeddings,
            store,
            defaults,
        }
    }

    /// Run one similarity search.
    ///
    /// `limit` is clamped to 1..=120 (config default when absent) and
    /// `min_similarity` to [0, 1].
    pub fn search(
        &self,
        query: &str,
        limit: Option<usize>,
        min_similarity: Option<f32>,
    ) -> SearchOutcome {
        let normalized = query.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.chars().count() < MIN_QUERY_CHARS {
            return SearchOutcome::disabled(DisabledReason::QueryTooShort);
        }

        let embedding = match self.embeddings.embed(&normalized) {
            Some(embedding) => embedding,
            None => return SearchOutcome::disabled(DisabledReason::EmbeddingUnavailable),
        };

        let store = match &self.store {
            Some(store) => store,
            None => return SearchOutcome::disabled(DisabledReason::StoreUnavailable),
        };

        let limit = limit
            .unwrap_or(self.defaults.match_count)
            .clamp(1, MAX_MATCH_COUNT);
        let min_similarity = min_similarity
            .unwrap_or(self.defaults.min_similarity)
            .clamp(0.0, 1.0);

        let rows = match store.query(&embedding, limit, min_similarity) {
            Ok(rows) => rows,
            Err(err) => {
                log::warn!("similarity query failed: {err}");
                return SearchOutcome::disabled(DisabledReason::RpcUnavailable);
            }
        };

        let mut results: Vec<SearchResult> = rows
            .into_iter()
            .filter(|row| !row.reference.is_empty() && row.similarity.is_finite())
            .map(|row| SearchResult {
                reference: row.reference,
                score: row.similarity.clamp(0.0, 1.0),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        SearchOutcome {
            enabled: true,
            reason: None,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::semantic::EmbeddingClient;

    fn embeddings_without_credential() -> Arc<dyn Embedder> {
        Arc::new(
            EmbeddingClient::new(EmbeddingConfig {
                dimensions: 3,
                api_key: None,
                ..Default::default()
            })
            .unwrap(),
        )
    }

    fn service() -> QueryService {
        QueryService::new(
            embeddings_without_credential(),
            None,
            SearchConfig::default(),
        )
    }

    #[test]
    fn test_short_query_is_rejected_locally() {
        let outcome = service().search("ap", None, None);
        assert!(!outcome.enabled);
        assert_eq!(outcome.reason, Some(DisabledReason::QueryTooShort));
        assert!(outcome.results.is_empty());
    }

    #[test]
    fn test_whitespace_only_query_is_too_short() {
        let outcome = service().search("  a \t b ", None, None);
        // normalizes to "a b", 3 chars, passes length; "  a  " would not
        assert_ne!(outcome.reason, Some(DisabledReason::QueryTooShort));

        let outcome = service().search("   a   ", None, None);
        assert_eq!(outcome.reason, Some(DisabledReason::QueryTooShort));
    }

    #[test]
    fn test_embedding_unavailable() {
        let outcome = service().search("appartement vue mer", None, None);
        assert!(!outcome.enabled);
        assert_eq!(outcome.reason, Some(DisabledReason::EmbeddingUnavailable));
        assert!(outcome.results.is_empty());
    }

    #[test]
    fn test_reason_serializes_snake_case() {
        let outcome = SearchOutcome::disabled(DisabledReason::EmbeddingUnavailable);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["enabled"], false);
        assert_eq!(json["reason"], "embedding_unavailable");

        let json =
            serde_json::to_value(SearchOutcome::disabled(DisabledReason::QueryTooShort)).unwrap();
        assert_eq!(json["reason"], "query_too_short");
    }

    #[test]
    fn test_enabled_outcome_omits_reason() {
        let outcome = SearchOutcome {
            enabled: true,
            reason: None,
            results: vec![SearchResult {
                reference: "REF-0001".to_string(),
                score: 0.81,
            }],
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("reason").is_none());
        assert_eq!(json["results"][0]["ref"], "REF-0001");
    }
}
