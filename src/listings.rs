//! Listing attributes and the catalog boundary.
//!
//! The listing catalog is owned by another component; this core only reads
//! pages of it when re-indexing. `ListingCatalog` is the seam, with a REST
//! backend for production and an in-memory backend for tests and local runs.

use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;

/// Canonical attributes of one property listing, read-only to this core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Listing {
    pub id: u64,

    /// Public reference code, e.g. "IMMO-2024-0231". Used as the result key
    /// so readers never need a join back to the catalog.
    pub reference: String,

    #[serde(default)]
    pub title: String,
    /// Transaction type, e.g. "vente" or "location".
    #[serde(default)]
    pub transaction: String,
    /// Property type, e.g. "appartement", "villa".
    #[serde(default)]
    pub property_type: String,
    #[serde(default)]
    pub category: String,
    /// Free-form location text, e.g. "Oran".
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    /// Display price kept as text, e.g. "12 500 000 DA".
    #[serde(default)]
    pub price_text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baths: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_sqm: Option<f64>,

    #[serde(default)]
    pub amenities: Vec<String>,
}

/// Read access to one page of the listing catalog.
///
/// Pages are ordered by a stable key (most recently created first, id as a
/// tiebreaker) so a batch caller can resume from any offset.
pub trait ListingCatalog: Send + Sync {
    fn fetch_page(&self, offset: usize, limit: usize) -> anyhow::Result<Vec<Listing>>;
}

/// Catalog backed by the store's REST interface (PostgREST-style).
pub struct RestCatalog {
    base_url: String,
    service_key: String,
    table: String,
    client: reqwest::blocking::Client,
}

impl RestCatalog {
    pub fn new(config: &StoreConfig) -> Option<Self> {
        let base_url = config.base_url.clone()?;
        let service_key = config.service_key.clone()?;
        if service_key.is_empty() {
            return None;
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .ok()?;

        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            table: config.listings_table.clone(),
            client,
        })
    }
}

impl ListingCatalog for RestCatalog {
    fn fetch_page(&self, offset: usize, limit: usize) -> anyhow::Result<Vec<Listing>> {
        let url = format!("{}/rest/v1/{}", self.base_url, self.table);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("select", "*"),
                ("order", "created_at.desc,id.desc"),
                ("offset", &offset.to_string()),
                ("limit", &limit.to_string()),
            ])
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .send()?
            .error_for_status()?;

        Ok(resp.json::<Vec<Listing>>()?)
    }
}

/// Fixed in-memory catalog, already in stable order.
#[allow(dead_code)]
pub struct MemoryCatalog {
    listings: Vec<Listing>,
}

#[allow(dead_code)]
impl MemoryCatalog {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self { listings }
    }
}

impl ListingCatalog for MemoryCatalog {
    fn fetch_page(&self, offset: usize, limit: usize) -> anyhow::Result<Vec<Listing>> {
        Ok(self
            .listings
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}
