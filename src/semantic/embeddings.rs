//! HTTP embedding provider.
//!
//! Wraps exactly one outbound call per invocation: POST `{model, input}` with
//! a bearer credential, hard timeout on the client, strict dimension check on
//! the response. Every failure mode collapses to `None`; callers branch on
//! the sentinel, nothing propagates as an error.

use serde_json::Value;
use std::time::Duration;

use crate::config::EmbeddingConfig;

/// Produces one fixed-dimension vector per text, or `None` when the provider
/// is unavailable. Implemented by the HTTP client and by test stubs.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Option<Vec<f32>>;
}

/// Client for a single-text embedding call against an OpenAI-compatible API.
pub struct EmbeddingClient {
    config: EmbeddingConfig,
    client: reqwest::blocking::Client,
}

impl EmbeddingClient {
    /// Build a client whose requests are cancelled at the configured timeout.
    pub fn new(config: EmbeddingConfig) -> reqwest::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Expected vector dimension.
    #[allow(dead_code)]
    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    /// Embed one text, or `None` when the provider is unavailable.
    ///
    /// Unavailable covers: empty input, missing credential, timeout or
    /// transport failure, non-2xx status, a payload without a usable vector,
    /// and a vector whose finite-element count differs from the configured
    /// dimension (too few after dropping non-finite elements, or too many).
    pub fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let input = text.trim();
        if input.is_empty() {
            return None;
        }

        let api_key = match &self.config.api_key {
            Some(key) if !key.is_empty() => key,
            _ => {
                log::debug!("embedding credential not configured; skipping call");
                return None;
            }
        };

        let payload = serde_json::json!({
            "model": self.config.model,
            "input": input,
        });

        let resp = match self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&payload)
            .send()
        {
            Ok(resp) => resp,
            Err(err) if err.is_timeout() => {
                log::warn!(
                    "embedding call timed out after {}s",
                    self.config.timeout_secs
                );
                return None;
            }
            Err(err) => {
                log::warn!("embedding call failed: {err}");
                return None;
            }
        };

        let status = resp.status();
        if !status.is_success() {
            log::warn!("embedding endpoint returned {status}");
            return None;
        }

        let body = match resp.json::<Value>() {
            Ok(body) => body,
            Err(err) => {
                log::warn!("embedding response is not valid JSON: {err}");
                return None;
            }
        };

        self.extract_vector(&body)
    }

    /// Pull the first result vector out of the loosely-typed response body.
    fn extract_vector(&self, body: &Value) -> Option<Vec<f32>> {
        let raw = body
            .get("data")
            .and_then(|data| data.as_array())
            .and_then(|data| data.first())
            .and_then(|item| item.get("embedding"))
            .and_then(|embedding| embedding.as_array());

        let raw = match raw {
            Some(raw) => raw,
            None => {
                log::warn!("embedding response has no usable vector");
                return None;
            }
        };

        // Coerce to finite floats; non-finite elements are dropped so a short
        // vector fails the length check instead of being silently truncated.
        let vector: Vec<f32> = raw
            .iter()
            .filter_map(|v| v.as_f64())
            .map(|v| v as f32)
            .filter(|v| v.is_finite())
            .collect();

        if vector.len() != self.config.dimensions {
            log::warn!(
                "embedding dimension mismatch: expected {}, got {}",
                self.config.dimensions,
                vector.len()
            );
            return None;
        }

        Some(vector)
    }
}

impl Embedder for EmbeddingClient {
    fn embed(&self, text: &str) -> Option<Vec<f32>> {
        EmbeddingClient::embed(self, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(dimensions: usize) -> EmbeddingClient {
        EmbeddingClient::new(EmbeddingConfig {
            dimensions,
            api_key: Some("test-key".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_empty_text_skips_call() {
        let client = client(3);
        assert!(client.embed("").is_none());
        assert!(client.embed("   \t\n").is_none());
    }

    #[test]
    fn test_missing_credential_skips_call() {
        let client = EmbeddingClient::new(EmbeddingConfig {
            dimensions: 3,
            api_key: None,
            ..Default::default()
        })
        .unwrap();

        assert!(client.embed("appartement").is_none());
    }

    #[test]
    fn test_extract_valid_vector() {
        let client = client(3);
        let body = json!({"data": [{"embedding": [0.1, 0.2, 0.3]}]});

        let vector = client.extract_vector(&body).unwrap();
        assert_eq!(vector.len(), 3);
        assert!((vector[0] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_extract_rejects_wrong_dimension() {
        let client = client(3);

        let short = json!({"data": [{"embedding": [0.1, 0.2]}]});
        assert!(client.extract_vector(&short).is_none());

        let long = json!({"data": [{"embedding": [0.1, 0.2, 0.3, 0.4]}]});
        assert!(client.extract_vector(&long).is_none());
    }

    #[test]
    fn test_extract_rejects_after_dropping_non_finite() {
        let client = client(3);

        // null coerces to nothing, leaving only two finite elements
        let body = json!({"data": [{"embedding": [0.1, null, 0.3]}]});
        assert!(client.extract_vector(&body).is_none());
    }

    #[test]
    fn test_extract_rejects_missing_shapes() {
        let client = client(3);

        assert!(client.extract_vector(&json!({})).is_none());
        assert!(client.extract_vector(&json!({"data": []})).is_none());
        assert!(client
            .extract_vector(&json!({"data": [{"embedding": "oops"}]}))
            .is_none());
    }
}
