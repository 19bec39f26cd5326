//! Vector literal encoding for the store boundary.
//!
//! The similarity store accepts embeddings as a bracketed text literal rather
//! than a JSON array. Encoding is fixed at 8 fractional digits so the same
//! vector always produces the same literal.

/// Number of fractional digits kept when rendering vector elements.
const PRECISION: usize = 8;

/// Render a vector as the store's canonical literal form.
///
/// Example: `[0.10000000,-0.25000000,1.00000000]`
pub fn encode(vector: &[f32]) -> String {
    let mut out = String::with_capacity(2 + vector.len() * (PRECISION + 4));
    out.push('[');
    for (i, value) in vector.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&format!("{value:.prec$}", prec = PRECISION));
    }
    out.push(']');
    out
}

/// Parse a vector literal back into its elements.
///
/// The query path never needs this (the store returns similarities, not
/// vectors); it exists for tooling and the round-trip tests.
#[allow(dead_code)]
pub fn decode(text: &str) -> Option<Vec<f32>> {
    let inner = text.trim().strip_prefix('[')?.strip_suffix(']')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }

    inner
        .split(',')
        .map(|part| part.trim().parse::<f32>().ok())
        .collect()
}
