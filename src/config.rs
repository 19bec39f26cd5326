use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default embedding endpoint (OpenAI-compatible)
const DEFAULT_EMBEDDING_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";
/// Default embedding model
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// Default embedding dimension
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;
/// Hard timeout for one embedding call in seconds
const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 12;

/// Default store request timeout in seconds
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

/// Default batch re-index page size
const DEFAULT_REINDEX_PAGE_SIZE: usize = 80;
/// Ceiling on how long a write-path caller waits for an index result
const DEFAULT_WRITE_CEILING_MS: u64 = 2500;

/// Environment variable holding the embedding provider credential
pub const EMBEDDING_API_KEY_VAR: &str = "IMMODEX_EMBEDDING_API_KEY";
/// Environment variable holding the store service credential
pub const STORE_SERVICE_KEY_VAR: &str = "IMMODEX_STORE_SERVICE_KEY";

/// Configuration for the embedding provider call
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embeddings endpoint URL
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    /// Model name sent with every request
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Expected vector dimension; anything else is rejected
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,

    /// Hard timeout for one call in seconds
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,

    /// Bearer credential, sourced from the environment at load time
    #[serde(skip_serializing, skip_deserializing)]
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_embedding_endpoint(),
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            timeout_secs: default_embedding_timeout_secs(),
            api_key: None,
        }
    }
}

/// Configuration for the similarity store and listing catalog REST interface
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the store, e.g. "https://project.example.co"
    #[serde(default)]
    pub base_url: Option<String>,

    /// Table holding one index entry per listing
    #[serde(default = "default_index_table")]
    pub index_table: String,

    /// Table holding the listing catalog
    #[serde(default = "default_listings_table")]
    pub listings_table: String,

    /// Store-side similarity match procedure
    #[serde(default = "default_match_function")]
    pub match_function: String,

    /// Request timeout in seconds
    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,

    /// Service credential, sourced from the environment at load time
    #[serde(skip_serializing, skip_deserializing)]
    pub service_key: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            index_table: default_index_table(),
            listings_table: default_listings_table(),
            match_function: default_match_function(),
            timeout_secs: default_store_timeout_secs(),
            service_key: None,
        }
    }
}

/// Search policy tunables
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default minimum similarity [0.0, 1.0]
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Default number of results per query
    #[serde(default = "default_match_count")]
    pub match_count: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_similarity: default_min_similarity(),
            match_count: default_match_count(),
        }
    }
}

/// Batch re-indexing tunables
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReindexConfig {
    /// Listings fetched per page of the batch job
    #[serde(default = "default_reindex_page_size")]
    pub page_size: usize,

    /// Ceiling in milliseconds on the write path's wait for an index result
    #[serde(default = "default_write_ceiling_ms")]
    pub write_ceiling_ms: u64,
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            page_size: default_reindex_page_size(),
            write_ceiling_ms: default_write_ceiling_ms(),
        }
    }
}

fn default_embedding_endpoint() -> String {
    DEFAULT_EMBEDDING_ENDPOINT.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_dimensions() -> usize {
    DEFAULT_EMBEDDING_DIMENSIONS
}

fn default_embedding_timeout_secs() -> u64 {
    DEFAULT_EMBEDDING_TIMEOUT_SECS
}

fn default_index_table() -> String {
    "listing_search_index".to_string()
}

fn default_listings_table() -> String {
    "listings".to_string()
}

fn default_match_function() -> String {
    "match_listings".to_string()
}

fn default_store_timeout_secs() -> u64 {
    DEFAULT_STORE_TIMEOUT_SECS
}

fn default_min_similarity() -> f32 {
    crate::semantic::DEFAULT_MIN_SIMILARITY
}

fn default_match_count() -> usize {
    crate::semantic::DEFAULT_MATCH_COUNT
}

fn default_reindex_page_size() -> usize {
    DEFAULT_REINDEX_PAGE_SIZE
}

fn default_write_ceiling_ms() -> u64 {
    DEFAULT_WRITE_CEILING_MS
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub reindex: ReindexConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            embedding: EmbeddingConfig::default(),
            store: StoreConfig::default(),
            search: SearchConfig::default(),
            reindex: ReindexConfig::default(),
            base_path: PathBuf::new(),
        }
    }
}

impl Config {
    fn validate(&mut self) {
        if url::Url::parse(&self.embedding.endpoint).is_err() {
            panic!(
                "embedding.endpoint is not a valid URL: '{}'",
                self.embedding.endpoint
            );
        }

        if self.embedding.dimensions == 0 {
            panic!("embedding.dimensions must be greater than 0");
        }

        if self.embedding.timeout_secs == 0 {
            panic!("embedding.timeout_secs must be greater than 0");
        }

        if let Some(base_url) = &self.store.base_url {
            if url::Url::parse(base_url).is_err() {
                panic!("store.base_url is not a valid URL: '{base_url}'");
            }
        }

        if !(0.0..=1.0).contains(&self.search.min_similarity) {
            panic!(
                "search.min_similarity must be between 0.0 and 1.0, got {}",
                self.search.min_similarity
            );
        }

        if self.search.match_count == 0
            || self.search.match_count > crate::semantic::MAX_MATCH_COUNT
        {
            panic!(
                "search.match_count must be between 1 and {}, got {}",
                crate::semantic::MAX_MATCH_COUNT,
                self.search.match_count
            );
        }

        if self.reindex.page_size == 0 {
            panic!("reindex.page_size must be greater than 0");
        }
    }

    /// Load configuration from `config.yaml` under `base_path`, creating a
    /// default file when missing and pulling credentials from the
    /// environment.
    pub fn load_with(base_path: &Path) -> Self {
        let config_path = base_path.join("config.yaml");

        // create new if does not exist
        if !config_path.exists() {
            std::fs::create_dir_all(base_path).expect("cannot create config directory");
            std::fs::write(
                &config_path,
                serde_yml::to_string(&Self::default()).unwrap(),
            )
            .expect("cannot write default config");
        }

        let config_str =
            std::fs::read_to_string(&config_path).expect("config file is not readable");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_path_buf();
        config.embedding.api_key = read_env(EMBEDDING_API_KEY_VAR);
        config.store.service_key = read_env(STORE_SERVICE_KEY_VAR);

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let config_path = self.base_path.join("config.yaml");
        let config_str = serde_yml::to_string(&self).unwrap();
        std::fs::write(config_path, config_str).expect("cannot write config");
    }
}

fn read_env(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.embedding.dimensions, 1536);
        assert_eq!(config.embedding.timeout_secs, 12);
        assert!((config.search.min_similarity - 0.43).abs() < f32::EPSILON);
        assert_eq!(config.search.match_count, 60);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_with(dir.path());

        assert!(dir.path().join("config.yaml").exists());
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.store.index_table, "listing_search_index");
        assert_eq!(config.reindex.page_size, 80);
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::load_with(dir.path());
        config.search.match_count = 30;
        config.save();

        let reloaded = Config::load_with(dir.path());
        assert_eq!(reloaded.search.match_count, 30);
    }

    #[test]
    #[should_panic(expected = "min_similarity")]
    fn test_invalid_threshold_panics() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            "search:\n  min_similarity: 1.5\n",
        )
        .unwrap();

        Config::load_with(dir.path());
    }
}
