//! Confidence model for engine detections.
//!
//! This is a heuristic prominence score built from fixed bonuses, not a
//! statistical probability:
//!
//! | component | bonus |
//! |---|---|
//! | base | 0.5 |
//! | text matches a plate grammar | +0.3 |
//! | aspect ratio in `[2.5, 4.5]` | +0.1 |
//! | contour area in `[5000, 25000]` px² | +0.1 |
//!
//! The sum is clamped to `[0, 1]`.

use std::ops::RangeInclusive;

const BASE: f64 = 0.5;
const FORMAT_BONUS: f64 = 0.3;
const ASPECT_BONUS: f64 = 0.1;
const AREA_BONUS: f64 = 0.1;

const IDEAL_ASPECT_RATIO: RangeInclusive<f64> = 2.5..=4.5;
const IDEAL_AREA: RangeInclusive<f64> = 5000.0..=25000.0;

pub fn calculate_confidence(format_valid: bool, aspect_ratio: f64, area: f64) -> f64 {
    let mut confidence = BASE;
    if format_valid {
        confidence += FORMAT_BONUS;
    }
    if IDEAL_ASPECT_RATIO.contains(&aspect_ratio) {
        confidence += ASPECT_BONUS;
    }
    if IDEAL_AREA.contains(&area) {
        confidence += AREA_BONUS;
    }
    confidence.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn ideal_candidate_scores_one() {
        assert_relative_eq!(calculate_confidence(true, 3.0, 8000.0), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn bonuses_are_independent() {
        assert_relative_eq!(calculate_confidence(true, 2.1, 1500.0), 0.8, epsilon = 1e-9);
        assert_relative_eq!(calculate_confidence(true, 4.5, 1500.0), 0.9, epsilon = 1e-9);
        assert_relative_eq!(calculate_confidence(true, 4.9, 25000.0), 0.9, epsilon = 1e-9);
        assert_relative_eq!(calculate_confidence(false, 3.0, 8000.0), 0.7, epsilon = 1e-9);
        assert_relative_eq!(calculate_confidence(false, 0.0, 0.0), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn always_within_unit_interval() {
        let ratios = [f64::NEG_INFINITY, -1.0, 0.0, 2.5, 3.3, 4.5, 100.0, f64::INFINITY, f64::NAN];
        let areas = [f64::NEG_INFINITY, -5.0, 0.0, 5000.0, 12000.0, 25000.0, 1e12, f64::INFINITY, f64::NAN];
        for valid in [false, true] {
            for &ratio in &ratios {
                for &area in &areas {
                    let c = calculate_confidence(valid, ratio, area);
                    assert!((0.0..=1.0).contains(&c), "{} {} {} -> {}", valid, ratio, area, c);
                }
            }
        }
    }
}
