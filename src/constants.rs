// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline-wide constants
//!
//! These are the defaults behind [`crate::config::Config`]. Anything that a
//! deployment might want to tune is read through the config instead of these
//! values directly.

use std::time::Duration;

// =============================================================================
// Point sampling
// =============================================================================

/// Length of the sampling window for a single tap
pub const SAMPLING_WINDOW_MS: u64 = 750;

/// Interval between sample ticks (~60 Hz)
pub const SAMPLE_INTERVAL_MS: u64 = 16;

/// Minimum number of accepted samples for a stabilized point
pub const MIN_SAMPLES: usize = 10;

/// Maximum allowed distance (cm) of any sample from the median point
pub const MAX_STABILITY_SPREAD_CM: f64 = 1.5;

/// Consecutive non-tracking ticks tolerated before sampling aborts
pub const MAX_BAD_TRACKING_FRAMES: u32 = 10;

/// Sampling window as a [`Duration`]
pub const SAMPLING_WINDOW: Duration = Duration::from_millis(SAMPLING_WINDOW_MS);

/// Sample interval as a [`Duration`]
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(SAMPLE_INTERVAL_MS);

// =============================================================================
// Measurement model
// =============================================================================

/// Fixed uncertainty floor added to every measurement
pub const BASE_UNCERTAINTY_CM: f64 = 0.5;

/// Maximum vertical difference between the two door bottom corners (meters)
pub const LEVEL_THRESHOLD_M: f64 = 0.03;

/// Meters to centimeters
pub const CM_PER_M: f64 = 100.0;

/// Stability factor steps keyed by average spread (cm).
///
/// The first entry whose bound is strictly greater than the average spread
/// wins; spreads beyond the last bound use [`STABILITY_FACTOR_FLOOR`].
pub const STABILITY_FACTOR_STEPS: [(f64, f64); 3] = [(0.5, 1.0), (1.0, 0.9), (1.5, 0.8)];

/// Stability factor for spreads at or above the last step
pub const STABILITY_FACTOR_FLOOR: f64 = 0.7;

/// Stability factor for an average spread in centimeters
pub fn stability_factor(avg_spread_cm: f64) -> f64 {
    STABILITY_FACTOR_STEPS
        .iter()
        .find(|(bound, _)| avg_spread_cm < *bound)
        .map(|(_, factor)| *factor)
        .unwrap_or(STABILITY_FACTOR_FLOOR)
}

/// Confidence score at or above which a measurement is shown as high confidence
pub const HIGH_CONFIDENCE: f64 = 0.8;

/// Confidence score at or above which a measurement is shown as medium confidence
pub const MEDIUM_CONFIDENCE: f64 = 0.6;

// =============================================================================
// Verdict
// =============================================================================

/// Minimum clearance beyond raw fit before a Pass is declared
pub const SAFETY_MARGIN_CM: f64 = 3.0;

/// Lowest combined confidence that may still produce a Pass
pub const MIN_PASS_CONFIDENCE: f64 = 0.7;

// =============================================================================
// Application
// =============================================================================

/// Directory name under the platform config dir
pub const APP_DIR_NAME: &str = "will-it-fit";

/// Config file name inside [`APP_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.json";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stability_factor_steps() {
        assert_eq!(stability_factor(0.0), 1.0);
        assert_eq!(stability_factor(0.49), 1.0);
        assert_eq!(stability_factor(0.5), 0.9);
        assert_eq!(stability_factor(0.99), 0.9);
        assert_eq!(stability_factor(1.0), 0.8);
        assert_eq!(stability_factor(1.49), 0.8);
        assert_eq!(stability_factor(1.5), 0.7);
        assert_eq!(stability_factor(12.0), 0.7);
    }

    #[test]
    fn test_window_matches_millis() {
        assert_eq!(SAMPLING_WINDOW.as_millis() as u64, SAMPLING_WINDOW_MS);
        assert_eq!(SAMPLE_INTERVAL.as_millis() as u64, SAMPLE_INTERVAL_MS);
    }
}
