//! Listing-age score curve.

/// Saturating age curve: `100 * (1 - 0.5^(age / half_life))`.
///
/// Zero age scores 0; the score reaches 50 at `half_life_days` and
/// approaches 100 asymptotically, so older listings always score at
/// least as high as younger ones.
#[derive(Debug, Clone, Copy)]
pub struct AgeCurve {
    half_life_days: f64,
}

impl AgeCurve {
    /// Builds a curve; `half_life_days` must be positive and finite.
    /// Config load validates env-sourced values, and the assert holds
    /// direct constructions to the same contract.
    #[must_use]
    pub fn new(half_life_days: f64) -> Self {
        debug_assert!(
            half_life_days.is_finite() && half_life_days > 0.0,
            "half_life_days must be positive and finite, got {half_life_days}"
        );
        Self { half_life_days }
    }

    /// Maps an age in days onto `[0.0, 100.0]`. Negative ages (clock skew,
    /// future-dated listings) score 0.
    #[must_use]
    pub fn score(&self, age_days: f64) -> f64 {
        if !age_days.is_finite() || age_days <= 0.0 {
            return 0.0;
        }
        let decayed = 0.5_f64.powf(age_days / self.half_life_days);
        (100.0 * (1.0 - decayed)).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_age_scores_zero() {
        assert_eq!(AgeCurve::new(365.0).score(0.0), 0.0);
    }

    #[test]
    fn negative_age_scores_zero() {
        assert_eq!(AgeCurve::new(365.0).score(-10.0), 0.0);
    }

    #[test]
    fn half_life_scores_fifty() {
        let score = AgeCurve::new(365.0).score(365.0);
        assert!((score - 50.0).abs() < 1e-9, "expected 50, got {score}");
    }

    #[test]
    fn score_is_monotonic_in_age() {
        let curve = AgeCurve::new(365.0);
        let mut last = -1.0;
        for age in [0.0, 1.0, 30.0, 90.0, 365.0, 1000.0, 10_000.0] {
            let s = curve.score(age);
            assert!(s >= last, "score regressed at age {age}: {s} < {last}");
            last = s;
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "half_life_days must be positive")]
    fn non_positive_half_life_is_rejected() {
        let _ = AgeCurve::new(0.0);
    }

    #[test]
    fn score_stays_in_bounds() {
        let curve = AgeCurve::new(30.0);
        for age in [0.0, 0.5, 7.0, 30.0, 365.0, 1.0e6] {
            let s = curve.score(age);
            assert!((0.0..=100.0).contains(&s), "out of bounds at {age}: {s}");
        }
    }
}
