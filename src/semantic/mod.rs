//! Semantic indexing and search for property listings.
//!
//! Keeps one vector index entry per listing and answers free-text similarity
//! queries, degrading in bounded stages when a dependency is down.
//!
//! # Architecture
//!
//! - `canonical`: Deterministic canonical text from listing attributes
//! - `codec`: Vector <-> text literal encoding for the store boundary
//! - `embeddings`: HTTP embedding provider with a hard timeout
//! - `store`: Similarity store adapters (REST and in-memory)
//! - `maintainer`: Single-listing and paginated batch re-indexing
//! - `service`: Query pipeline with typed degradation reasons

pub mod canonical;
pub mod codec;
pub mod embeddings;
mod maintainer;
mod service;
mod store;

pub use embeddings::{Embedder, EmbeddingClient};
pub use maintainer::{trigger_reindex, IndexMaintainer, ReindexReport};
pub use service::{DisabledReason, QueryService, SearchOutcome};
pub use store::{IndexEntry, MemoryStore, RestStore, SimilarityRow, SimilarityStore, StoreError};

/// Default similarity threshold for listing search
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.43;

/// Default number of results per query
pub const DEFAULT_MATCH_COUNT: usize = 60;

/// Hard cap on results per query
pub const MAX_MATCH_COUNT: usize = 120;

/// Minimum normalized query length (characters)
pub const MIN_QUERY_CHARS: usize = 3;
