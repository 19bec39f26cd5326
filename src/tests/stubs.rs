//! Shared test doubles for the semantic pipeline.

use crate::semantic::Embedder;

pub const DIMS: usize = 16;

/// Deterministic embedder: projects the text's words into a fixed number of
/// buckets, so identical texts always produce identical vectors and texts
/// sharing words land close together.
pub struct StubEmbedder;

impl Embedder for StubEmbedder {
    fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }

        let mut vector = vec![0.0f32; DIMS];
        for word in text.split_whitespace() {
            let mut bucket = 0usize;
            for byte in word.bytes() {
                bucket = bucket.wrapping_mul(31).wrapping_add(byte as usize);
            }
            vector[bucket % DIMS] += 1.0;
        }
        Some(vector)
    }
}
