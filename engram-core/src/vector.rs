//! Embedding vector codec and similarity.
//!
//! Vectors are stored as little-endian float32 blobs, 4 bytes per
//! element. The engine never inspects dimensionality beyond equality
//! checks at compare time.

use crate::errors::{EngramError, EngramResult};

/// Serialize a float vector to its blob form (little-endian).
pub fn to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize a blob back into a float vector. Copies the bytes, so
/// alignment of the input does not matter.
pub fn from_blob(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity between two vectors, in [-1, 1].
///
/// Fails with `VectorLenMismatch` if lengths differ and `ZeroLengthVector`
/// if either is empty. A zero-magnitude vector yields similarity 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> EngramResult<f64> {
    if a.is_empty() || b.is_empty() {
        return Err(EngramError::ZeroLengthVector);
    }
    if a.len() != b.len() {
        return Err(EngramError::VectorLenMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
}
