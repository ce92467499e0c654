//! Strength and scoring formulas.
//!
//! ```text
//! effective_strength = intensity × e^(−λ / resistance(access_count) × hours)
//! search_score       = 0.6·similarity + 0.3·strength + 0.1·recency
//! ```
//!
//! All functions are total and deterministic.

use engram_core::constants::{
    DECAY_LAMBDA, RETRIEVAL_BOOST, WEIGHT_RECENCY, WEIGHT_SIMILARITY, WEIGHT_STRENGTH,
};

/// Frequently accessed chunks decay slower: `1 + ln(1 + n) × 0.3`.
///
/// Always >= 1.0; grows logarithmically in the access count.
pub fn decay_resistance(access_count: i64) -> f64 {
    1.0 + (1.0 + access_count.max(0) as f64).ln() * 0.3
}

/// Running intensity attenuated by time since last access.
///
/// Monotonically non-increasing in `hours_since_access`, non-decreasing
/// in `access_count` for fixed intensity.
pub fn effective_strength(intensity: f64, access_count: i64, hours_since_access: f64) -> f64 {
    intensity * (-DECAY_LAMBDA / decay_resistance(access_count) * hours_since_access.max(0.0)).exp()
}

/// Freshness of the chunk itself: `e^(−0.01 × days)`.
pub fn recency_score(days_since_creation: f64) -> f64 {
    (-0.01 * days_since_creation.max(0.0)).exp()
}

/// Composite recall rank: weighted sum of similarity, effective
/// strength, and recency.
pub fn search_score(similarity: f64, strength: f64, recency: f64) -> f64 {
    WEIGHT_SIMILARITY * similarity + WEIGHT_STRENGTH * strength + WEIGHT_RECENCY * recency
}

/// Moving average over encounters: `(old·n + reading) / (n + 1)`.
///
/// Early readings dominate, later readings refine; converges to the
/// reading as n grows.
pub fn updated_intensity(old_intensity: f64, encounter_count: i64, new_reading: f64) -> f64 {
    let n = encounter_count.max(0) as f64;
    (old_intensity * n + new_reading) / (n + 1.0)
}

/// Small additive bump on access, clamped to 1.0.
pub fn retrieval_boost(intensity: f64) -> f64 {
    (intensity + RETRIEVAL_BOOST).min(1.0)
}
