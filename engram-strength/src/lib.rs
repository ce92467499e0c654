//! # engram-strength
//!
//! The strength/decay model. Pure math, no I/O:
//! running-intensity moving average, access-frequency-weighted
//! exponential decay, retrieval boost, and the composite search score.

pub mod formula;

pub use formula::{
    decay_resistance, effective_strength, recency_score, retrieval_boost, search_score,
    updated_intensity,
};
