// SPDX-License-Identifier: GPL-3.0-only

//! Verdict engine
//!
//! Compares a completed measurement against a product. The engine never
//! claims more certainty than the measurement supports: missing data, low
//! confidence, estimated surfaces and tight fits all map to
//! [`Verdict::NotSure`]. Only a product that provably doesn't fit is a
//! [`Verdict::Fail`].

use crate::catalog::Product;
use crate::config::VerdictConfig;
use crate::measurement::{
    Dimension, DoorMeasurement, MeasurementResult, PartialMeasurement, SpaceMeasurement,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fit decision with a human-readable reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pass(String),
    Fail(String),
    NotSure(String),
}

impl Verdict {
    pub fn reason(&self) -> &str {
        match self {
            Verdict::Pass(reason) | Verdict::Fail(reason) | Verdict::NotSure(reason) => reason,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Verdict::Pass(_) => "WILL FIT",
            Verdict::Fail(_) => "WON'T FIT",
            Verdict::NotSure(_) => "NOT SURE",
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass(_))
    }
}

const LOW_CONFIDENCE: &str = "Low confidence measurement. Try again with better lighting.";
const TIGHT_FIT: &str = "Tight fit - measure with tape measure to confirm.";

/// Clearances this close to zero are arithmetic noise, not an overage
const FLOAT_NOISE_CM: f64 = 1e-6;

/// Whole centimeters a product is too large by, never less than 1
fn reported_overage_cm(clearance: f64) -> i64 {
    ((-clearance + FLOAT_NOISE_CM).floor() as i64).max(1)
}

/// One dimension's comparison
struct Check<'a> {
    dimension: Dimension,
    measured: &'a MeasurementResult,
    product_cm: f64,
}

impl Check<'_> {
    fn clearance(&self) -> f64 {
        self.measured.value_cm - self.product_cm
    }
}

/// Evaluate any measurement snapshot against a product
pub fn evaluate(measurement: &PartialMeasurement, product: &Product, config: &VerdictConfig) -> Verdict {
    let verdict = match measurement {
        PartialMeasurement::Door(door) => verdict_for_door(door, product, config),
        PartialMeasurement::Space(space) => verdict_for_space(space, product, config),
        PartialMeasurement::Empty => {
            Verdict::NotSure("Incomplete measurement - nothing was measured".to_string())
        }
    };
    debug!(product = %product.id, ?verdict, "Verdict produced");
    verdict
}

/// Width for door checks; rotatable products go through on their narrower side
fn effective_door_width(product: &Product) -> f64 {
    if product.allow_rotate {
        product.width_cm.min(product.depth_cm)
    } else {
        product.width_cm
    }
}

pub fn verdict_for_door(door: &DoorMeasurement, product: &Product, config: &VerdictConfig) -> Verdict {
    let Some(width) = door.width.as_ref() else {
        return Verdict::NotSure("Incomplete measurement - missing width".to_string());
    };
    let Some(height) = door.height.as_ref() else {
        return Verdict::NotSure("Incomplete measurement - missing height".to_string());
    };

    if width.used_estimated_surface() || height.used_estimated_surface() {
        return Verdict::NotSure(
            "Measurement used estimated surface (no plane detected). Scan the floor/door frame more slowly and try again."
                .to_string(),
        );
    }

    let checks = [
        Check {
            dimension: Dimension::Width,
            measured: width,
            product_cm: effective_door_width(product),
        },
        Check {
            dimension: Dimension::Height,
            measured: height,
            product_cm: product.height_cm,
        },
    ];

    judge(&checks, "door", config)
}

pub fn verdict_for_space(
    space: &SpaceMeasurement,
    product: &Product,
    config: &VerdictConfig,
) -> Verdict {
    let Some(width) = space.width.as_ref() else {
        return Verdict::NotSure("Incomplete measurement - missing width".to_string());
    };
    let Some(depth) = space.depth.as_ref() else {
        return Verdict::NotSure("Incomplete measurement - missing depth".to_string());
    };
    let Some(height) = space.height.as_ref() else {
        return Verdict::NotSure("Incomplete measurement - missing height".to_string());
    };

    // Ceilings are hard to hit, so only the walls must be real planes
    if width.used_estimated_surface() || depth.used_estimated_surface() {
        return Verdict::NotSure(
            "Wall measurement used estimated surface. Scan the walls more slowly and try again."
                .to_string(),
        );
    }

    let checks = [
        Check {
            dimension: Dimension::Width,
            measured: width,
            product_cm: product.width_cm,
        },
        Check {
            dimension: Dimension::Depth,
            measured: depth,
            product_cm: product.depth_cm,
        },
        Check {
            dimension: Dimension::Height,
            measured: height,
            product_cm: product.height_cm,
        },
    ];

    judge(&checks, "space", config)
}

/// Shared tail of the door and space evaluations
fn judge(checks: &[Check<'_>], opening: &str, config: &VerdictConfig) -> Verdict {
    for check in checks {
        let clearance = check.clearance();
        if clearance < -FLOAT_NOISE_CM {
            return Verdict::Fail(format!(
                "Product {} ({}cm) exceeds {} by {}cm",
                check.dimension,
                check.product_cm as i64,
                opening,
                reported_overage_cm(clearance)
            ));
        }
    }

    let confidence = checks
        .iter()
        .map(|c| c.measured.confidence)
        .fold(f64::INFINITY, f64::min);
    if confidence < config.min_pass_confidence {
        return Verdict::NotSure(LOW_CONFIDENCE.to_string());
    }

    let clears_margin = checks
        .iter()
        .all(|c| c.clearance() >= config.safety_margin_cm + c.measured.uncertainty_cm);

    if clears_margin {
        let min_clearance = checks
            .iter()
            .map(Check::clearance)
            .fold(f64::INFINITY, f64::min);
        return Verdict::Pass(format!(
            "Product fits with {}cm clearance",
            min_clearance as i64
        ));
    }

    Verdict::NotSure(TIGHT_FIT.to_string())
}

/// Whether turning a rotatable product (depth as width) would get it
/// through a door it otherwise can't pass. Informational only.
pub fn suggest_rotation(door: &DoorMeasurement, product: &Product, config: &VerdictConfig) -> bool {
    if !product.allow_rotate {
        return false;
    }
    let (Some(width), Some(_height)) = (door.width.as_ref(), door.height.as_ref()) else {
        return false;
    };

    let normal_clearance = width.value_cm - product.width_cm;
    let rotated_clearance = width.value_cm - product.depth_cm;

    normal_clearance < 0.0 && rotated_clearance >= config.safety_margin_cm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::HitQuality;

    fn result(dimension: Dimension, value_cm: f64) -> MeasurementResult {
        MeasurementResult {
            dimension,
            value_cm,
            uncertainty_cm: 0.5,
            confidence: 1.0,
            quality: HitQuality::ExistingPlane,
        }
    }

    fn door(width: f64, height: f64) -> DoorMeasurement {
        DoorMeasurement {
            width: Some(result(Dimension::Width, width)),
            height: Some(result(Dimension::Height, height)),
        }
    }

    fn space(width: f64, depth: f64, height: f64) -> SpaceMeasurement {
        SpaceMeasurement {
            width: Some(result(Dimension::Width, width)),
            depth: Some(result(Dimension::Depth, depth)),
            height: Some(result(Dimension::Height, height)),
        }
    }

    #[test]
    fn test_door_pass() {
        let config = VerdictConfig::default();
        let product = Product::with_dimensions(90.0, 200.0, 60.0);
        let verdict = verdict_for_door(&door(100.0, 210.0), &product, &config);
        assert_eq!(verdict, Verdict::Pass("Product fits with 10cm clearance".to_string()));
        assert_eq!(verdict.title(), "WILL FIT");
    }

    #[test]
    fn test_door_fail_reports_overage() {
        let config = VerdictConfig::default();
        let product = Product::with_dimensions(105.0, 200.0, 60.0);
        let verdict = verdict_for_door(&door(100.0, 210.0), &product, &config);
        assert_eq!(
            verdict,
            Verdict::Fail("Product width (105cm) exceeds door by 5cm".to_string())
        );

        let tall = Product::with_dimensions(90.0, 215.0, 60.0);
        let verdict = verdict_for_door(&door(100.0, 210.0), &tall, &config);
        assert_eq!(
            verdict,
            Verdict::Fail("Product height (215cm) exceeds door by 5cm".to_string())
        );
    }

    #[test]
    fn test_overage_never_reported_as_zero() {
        let config = VerdictConfig::default();

        // Sub-centimeter overage still fails and reports 1cm
        let product = Product::with_dimensions(100.4, 200.0, 60.0);
        assert_eq!(
            verdict_for_door(&door(100.0, 210.0), &product, &config),
            Verdict::Fail("Product width (100cm) exceeds door by 1cm".to_string())
        );

        // Noise just under a whole overage doesn't drop a centimeter
        let product = Product::with_dimensions(100.0, 200.0, 60.0);
        assert_eq!(
            verdict_for_door(&door(94.99999999999999, 210.0), &product, &config),
            Verdict::Fail("Product width (100cm) exceeds door by 5cm".to_string())
        );

        // Noise around an exact fit is a tight fit, not a failure
        let product = Product::with_dimensions(95.0, 200.0, 60.0);
        assert_eq!(
            verdict_for_door(&door(94.99999999999999, 210.0), &product, &config),
            Verdict::NotSure(TIGHT_FIT.to_string())
        );
    }

    #[test]
    fn test_door_missing_dimension() {
        let config = VerdictConfig::default();
        let product = Product::with_dimensions(90.0, 200.0, 60.0);
        let partial = DoorMeasurement {
            width: Some(result(Dimension::Width, 100.0)),
            height: None,
        };
        let verdict = verdict_for_door(&partial, &product, &config);
        assert_eq!(
            verdict,
            Verdict::NotSure("Incomplete measurement - missing height".to_string())
        );
    }

    #[test]
    fn test_estimated_surface_is_not_sure_even_when_roomy() {
        let config = VerdictConfig::default();
        let product = Product::with_dimensions(50.0, 100.0, 50.0);
        let mut measured = door(200.0, 250.0);
        if let Some(width) = measured.width.as_mut() {
            width.quality = HitQuality::EstimatedSurface;
        }
        let verdict = verdict_for_door(&measured, &product, &config);
        assert!(matches!(verdict, Verdict::NotSure(_)));
        assert!(verdict.reason().contains("estimated surface"));
    }

    #[test]
    fn test_hard_fail_precedes_low_confidence() {
        let config = VerdictConfig::default();
        let product = Product::with_dimensions(120.0, 200.0, 60.0);
        let mut measured = door(100.0, 210.0);
        if let Some(width) = measured.width.as_mut() {
            width.confidence = 0.3;
        }
        assert!(matches!(
            verdict_for_door(&measured, &product, &config),
            Verdict::Fail(_)
        ));

        let fits = Product::with_dimensions(90.0, 200.0, 60.0);
        assert_eq!(
            verdict_for_door(&measured, &fits, &config),
            Verdict::NotSure(LOW_CONFIDENCE.to_string())
        );
    }

    #[test]
    fn test_tight_fit() {
        let config = VerdictConfig::default();
        // 3cm clearance < 3cm margin + 0.5cm uncertainty
        let product = Product::with_dimensions(97.0, 200.0, 60.0);
        assert_eq!(
            verdict_for_door(&door(100.0, 210.0), &product, &config),
            Verdict::NotSure(TIGHT_FIT.to_string())
        );
    }

    #[test]
    fn test_rotation_uses_narrower_side() {
        let config = VerdictConfig::default();
        let mut tv = Product::with_dimensions(145.0, 83.0, 5.0);
        tv.allow_rotate = true;
        let measured = door(90.0, 210.0);

        assert!(verdict_for_door(&measured, &tv, &config).is_pass());
        assert!(suggest_rotation(&measured, &tv, &config));

        tv.allow_rotate = false;
        assert!(!suggest_rotation(&measured, &tv, &config));
        assert!(matches!(
            verdict_for_door(&measured, &tv, &config),
            Verdict::Fail(_)
        ));
    }

    #[test]
    fn test_space_allows_estimated_ceiling() {
        let config = VerdictConfig::default();
        let product = Product::with_dimensions(60.0, 85.0, 60.0);
        let mut measured = space(100.0, 100.0, 240.0);
        if let Some(height) = measured.height.as_mut() {
            height.quality = HitQuality::EstimatedSurface;
        }
        assert_eq!(
            verdict_for_space(&measured, &product, &config),
            Verdict::Pass("Product fits with 40cm clearance".to_string())
        );

        if let Some(depth) = measured.depth.as_mut() {
            depth.quality = HitQuality::EstimatedSurface;
        }
        assert!(matches!(
            verdict_for_space(&measured, &product, &config),
            Verdict::NotSure(_)
        ));
    }

    #[test]
    fn test_space_depth_fail() {
        let config = VerdictConfig::default();
        let product = Product::with_dimensions(60.0, 85.0, 80.0);
        assert_eq!(
            verdict_for_space(&space(100.0, 70.0, 240.0), &product, &config),
            Verdict::Fail("Product depth (80cm) exceeds space by 10cm".to_string())
        );
    }

    #[test]
    fn test_empty_measurement() {
        let config = VerdictConfig::default();
        let product = Product::with_dimensions(60.0, 85.0, 60.0);
        assert!(matches!(
            evaluate(&PartialMeasurement::Empty, &product, &config),
            Verdict::NotSure(_)
        ));
    }
}
