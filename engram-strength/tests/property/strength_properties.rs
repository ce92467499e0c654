//! Property tests for the strength model.

use engram_strength::formula::*;
use proptest::prelude::*;

proptest! {
    /// Strength never increases as time passes.
    #[test]
    fn strength_monotone_in_hours(
        intensity in 0.0f64..=1.0,
        n in 0i64..10_000,
        h1 in 0.0f64..100_000.0,
        dh in 0.0f64..100_000.0,
    ) {
        let earlier = effective_strength(intensity, n, h1);
        let later = effective_strength(intensity, n, h1 + dh);
        prop_assert!(later <= earlier + 1e-12);
    }

    /// More accesses never weaken a chunk, for fixed intensity and age.
    #[test]
    fn strength_monotone_in_access_count(
        intensity in 0.0f64..=1.0,
        n in 0i64..10_000,
        extra in 0i64..10_000,
        hours in 0.0f64..100_000.0,
    ) {
        let fewer = effective_strength(intensity, n, hours);
        let more = effective_strength(intensity, n + extra, hours);
        prop_assert!(more + 1e-12 >= fewer);
    }

    /// Repeated reinforcement with a constant reading converges the
    /// running intensity to that reading.
    #[test]
    fn intensity_converges_to_reading(
        old in 0.0f64..=1.0,
        reading in 0.0f64..=1.0,
    ) {
        let mut intensity = old;
        let mut gap = (intensity - reading).abs();
        for n in 1i64..=2_000 {
            intensity = updated_intensity(intensity, n, reading);
            let next_gap = (intensity - reading).abs();
            prop_assert!(next_gap <= gap + 1e-12);
            gap = next_gap;
        }
        // After k encounters the initial gap shrinks by a factor of 1/k.
        prop_assert!(gap <= (old - reading).abs() / 1_000.0 + 1e-9);
    }

    /// Averaging two values in [0, 1] stays in [0, 1].
    #[test]
    fn intensity_stays_in_unit_interval(
        old in 0.0f64..=1.0,
        n in 1i64..10_000,
        reading in 0.0f64..=1.0,
    ) {
        let updated = updated_intensity(old, n, reading);
        prop_assert!((0.0..=1.0).contains(&updated));
    }

    /// The boost is clamped to 1.0 and never decreases intensity.
    #[test]
    fn boost_bounds(intensity in 0.0f64..=1.0) {
        let boosted = retrieval_boost(intensity);
        prop_assert!(boosted >= intensity);
        prop_assert!(boosted <= 1.0);
    }

    /// Composite score of unit inputs stays within [−0.6, 1.0]:
    /// similarity may be negative, strength and recency cannot.
    #[test]
    fn score_bounds(
        sim in -1.0f64..=1.0,
        strength in 0.0f64..=1.0,
        recency in 0.0f64..=1.0,
    ) {
        let s = search_score(sim, strength, recency);
        prop_assert!(s <= 1.0 + 1e-12);
        prop_assert!(s >= -0.6 - 1e-12);
    }
}
