// SPDX-License-Identifier: GPL-3.0-only

//! Measurement result model
//!
//! Turns two stabilized endpoints into a distance with an uncertainty
//! margin and a confidence score. Pure and total.

use super::types::{Dimension, MeasurementResult, StabilizedPoint};
use crate::constants::{BASE_UNCERTAINTY_CM, CM_PER_M, stability_factor};

/// How the distance between two endpoints is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementKind {
    /// Distance in the X-Z plane, vertical offset ignored
    Horizontal,
    /// Absolute Y offset only
    Vertical,
}

impl MeasurementKind {
    /// Raw distance between two points in centimeters
    pub fn distance_cm(&self, from: &StabilizedPoint, to: &StabilizedPoint) -> f64 {
        let delta = to.position - from.position;
        let meters = match self {
            MeasurementKind::Horizontal => (delta.x * delta.x + delta.z * delta.z).sqrt(),
            MeasurementKind::Vertical => delta.y.abs(),
        };
        meters * CM_PER_M
    }
}

/// Build a [`MeasurementResult`] using the default uncertainty floor
pub fn measure(
    dimension: Dimension,
    kind: MeasurementKind,
    from: &StabilizedPoint,
    to: &StabilizedPoint,
) -> MeasurementResult {
    measure_with_base(dimension, kind, from, to, BASE_UNCERTAINTY_CM)
}

/// Build a [`MeasurementResult`] with an explicit uncertainty floor (cm)
pub fn measure_with_base(
    dimension: Dimension,
    kind: MeasurementKind,
    from: &StabilizedPoint,
    to: &StabilizedPoint,
    base_uncertainty_cm: f64,
) -> MeasurementResult {
    let quality = from.quality.worse(to.quality);

    let tracking_factor = (from.tracking_confidence + to.tracking_confidence) / 2.0;
    let avg_spread_cm = (from.spread_cm + to.spread_cm) / 2.0;
    let confidence = (tracking_factor * quality.confidence_multiplier()
        * stability_factor(avg_spread_cm))
    .clamp(0.0, 1.0);

    let uncertainty_cm = base_uncertainty_cm + avg_spread_cm + quality.uncertainty_cm();

    MeasurementResult {
        dimension,
        value_cm: kind.distance_cm(from, to),
        uncertainty_cm,
        confidence,
        quality,
    }
}
