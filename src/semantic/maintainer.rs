//! Index maintenance: single-listing re-index and the paginated batch job.
//!
//! Nothing in here propagates failures to its caller: the single-listing path
//! collapses every failure mode to `false`, and the write-path trigger races
//! the index write against a short ceiling so a listing create/update is
//! never held up by indexing.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::listings::{Listing, ListingCatalog};
use crate::semantic::canonical::canonical_text;
use crate::semantic::store::{IndexEntry, SimilarityStore};
use crate::semantic::Embedder;

/// Outcome of one page of the batch re-index job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReindexReport {
    pub processed: usize,
    pub indexed: usize,
    pub failed: usize,
    pub next_offset: usize,
    pub has_more: bool,
}

/// Orchestrates canonical text -> embedding -> store upsert for listings.
pub struct IndexMaintainer {
    catalog: Option<Arc<dyn ListingCatalog>>,
    embeddings: Arc<dyn Embedder>,
    store: Option<Arc<dyn SimilarityStore>>,
}

impl IndexMaintainer {
    pub fn new(
        catalog: Option<Arc<dyn ListingCatalog>>,
        embeddings: Arc<dyn Embedder>,
        store: Option<Arc<dyn SimilarityStore>>,
    ) -> Self {
        Self {
            catalog,
            embeddings,
            store,
        }
    }

    /// Re-index one listing. Best-effort: returns true iff a fresh entry was
    /// written; every failure mode collapses to false.
    ///
    /// Concurrent calls for the same listing need no serialization; the
    /// store upsert is a full replace keyed on the listing id, so the last
    /// successful write wins regardless of call order.
    pub fn reindex_one(&self, listing: &Listing) -> bool {
        let text = canonical_text(listing);
        if text.is_empty() {
            log::debug!("listing {} has nothing to index", listing.id);
            return false;
        }

        let embedding = match self.embeddings.embed(&text) {
            Some(embedding) => embedding,
            None => return false,
        };

        let store = match &self.store {
            Some(store) => store,
            None => {
                log::debug!("similarity store not configured; skipping index write");
                return false;
            }
        };

        let entry = IndexEntry {
            listing_id: listing.id,
            listing_ref: listing.reference.clone(),
            canonical_text: text,
            embedding,
            updated_at: Utc::now(),
        };

        match store.upsert(&entry) {
            Ok(()) => {
                log::debug!("indexed listing {} ({})", listing.id, listing.reference);
                true
            }
            Err(err) => {
                log::warn!("index upsert failed for listing {}: {err}", listing.id);
                false
            }
        }
    }

    /// Process exactly one page of the catalog, strictly sequentially to
    /// bound load on the embedding provider.
    ///
    /// Idempotent and resumable: a caller advances `offset` via
    /// `next_offset` until `has_more` is false.
    pub fn reindex_page(&self, offset: usize, limit: usize) -> anyhow::Result<ReindexReport> {
        let catalog = self
            .catalog
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("listing catalog is not configured"))?;
        let listings = catalog.fetch_page(offset, limit)?;
        let returned = listings.len();

        let mut indexed = 0;
        let mut failed = 0;
        for listing in &listings {
            if self.reindex_one(listing) {
                indexed += 1;
            } else {
                failed += 1;
            }
        }

        let report = ReindexReport {
            processed: returned,
            indexed,
            failed,
            next_offset: offset + returned,
            has_more: returned == limit,
        };

        log::info!(
            "reindex page offset={offset}: processed={} indexed={} failed={}",
            report.processed,
            report.indexed,
            report.failed
        );

        Ok(report)
    }
}

/// Fire-and-forget re-index for the write path.
///
/// The index write and a timer run as independent tasks; whichever finishes
/// first bounds the caller's wait. When the timer wins the write keeps
/// running to completion in the background, where finishing late is safe
/// because it is side-effect-only, and `None` is returned.
pub async fn trigger_reindex(
    maintainer: Arc<IndexMaintainer>,
    listing: Listing,
    ceiling: Duration,
) -> Option<bool> {
    let handle = tokio::task::spawn_blocking(move || maintainer.reindex_one(&listing));

    match tokio::time::timeout(ceiling, handle).await {
        Ok(Ok(indexed)) => Some(indexed),
        Ok(Err(err)) => {
            log::error!("index task panicked: {err}");
            Some(false)
        }
        Err(_) => {
            log::debug!(
                "index write exceeded {}ms ceiling, continuing in background",
                ceiling.as_millis()
            );
            None
        }
    }
}
