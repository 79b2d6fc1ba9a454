// SPDX-License-Identifier: MPL-2.0

//! Core measurement data model
//!
//! Positions are world-space meters (Y up); every derived quantity is in
//! centimeters.

use crate::constants::{HIGH_CONFIDENCE, MEDIUM_CONFIDENCE};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reliability tier of a single hit, ordered by descending reliability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HitQuality {
    /// Hit inside reconstructed plane geometry
    ExistingPlane,
    /// Hit on a depth-sensor point
    DepthPoint,
    /// Anything weaker: feature points, planes hit outside their polygon
    EstimatedSurface,
}

impl HitQuality {
    pub const ALL: [HitQuality; 3] = [
        HitQuality::ExistingPlane,
        HitQuality::DepthPoint,
        HitQuality::EstimatedSurface,
    ];

    /// Multiplier applied to the confidence score
    pub fn confidence_multiplier(&self) -> f64 {
        match self {
            HitQuality::ExistingPlane => 1.0,
            HitQuality::DepthPoint => 0.85,
            HitQuality::EstimatedSurface => 0.6,
        }
    }

    /// Extra uncertainty contributed by this tier (cm)
    pub fn uncertainty_cm(&self) -> f64 {
        match self {
            HitQuality::ExistingPlane => 0.0,
            HitQuality::DepthPoint => 0.5,
            HitQuality::EstimatedSurface => 1.5,
        }
    }

    /// The less reliable of two tiers
    pub fn worse(self, other: HitQuality) -> HitQuality {
        if self.confidence_multiplier() < other.confidence_multiplier() {
            self
        } else {
            other
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            HitQuality::ExistingPlane => "plane",
            HitQuality::DepthPoint => "depth point",
            HitQuality::EstimatedSurface => "estimated surface",
        }
    }
}

/// Plane alignment a step prefers when choosing among hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Alignment {
    Horizontal,
    Vertical,
    #[default]
    Any,
}

/// What the user is measuring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MeasurementMode {
    /// Doorway width and height (3 taps)
    #[default]
    Door,
    /// Space width, depth and height (6 taps)
    Space,
    /// Box placement only, no measurement protocol
    VirtualPlacement,
}

impl MeasurementMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            MeasurementMode::Door => "Door",
            MeasurementMode::Space => "Space",
            MeasurementMode::VirtualPlacement => "Virtual placement",
        }
    }
}

/// A single stabilized 3D point produced by the sampler
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilizedPoint {
    /// Per-axis median of the accepted samples (meters)
    pub position: DVec3,
    /// Most frequent hit quality among the accepted samples
    pub quality: HitQuality,
    /// Max distance of any accepted sample from `position` (cm)
    pub spread_cm: f64,
    /// Tracking confidence in effect at capture time, in [0, 1]
    pub tracking_confidence: f64,
    /// Number of accepted samples
    pub sample_count: usize,
}

impl StabilizedPoint {
    /// Point with perfect tracking and zero spread, mostly useful for tests
    pub fn exact(position: DVec3, quality: HitQuality) -> Self {
        Self {
            position,
            quality,
            spread_cm: 0.0,
            tracking_confidence: 1.0,
            sample_count: 0,
        }
    }
}

/// Physical dimension a measurement describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Width,
    Height,
    Depth,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Width => write!(f, "width"),
            Dimension::Height => write!(f, "height"),
            Dimension::Depth => write!(f, "depth"),
        }
    }
}

/// Coarse confidence bucket for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

/// One measured dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub dimension: Dimension,
    pub value_cm: f64,
    pub uncertainty_cm: f64,
    /// Confidence score in [0, 1]
    pub confidence: f64,
    /// Worse of the two endpoint qualities
    pub quality: HitQuality,
}

impl MeasurementResult {
    pub fn confidence_level(&self) -> ConfidenceLevel {
        if self.confidence >= HIGH_CONFIDENCE {
            ConfidenceLevel::High
        } else if self.confidence >= MEDIUM_CONFIDENCE {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    /// e.g. "100 cm"
    pub fn formatted_value(&self) -> String {
        format!("{} cm", self.value_cm as i64)
    }

    /// e.g. "+/- 0.5 cm"
    pub fn formatted_uncertainty(&self) -> String {
        format!("+/- {:.1} cm", self.uncertainty_cm)
    }

    pub(crate) fn used_estimated_surface(&self) -> bool {
        self.quality == HitQuality::EstimatedSurface
    }
}

/// Door measurement in progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoorMeasurement {
    pub width: Option<MeasurementResult>,
    pub height: Option<MeasurementResult>,
}

impl DoorMeasurement {
    pub fn is_complete(&self) -> bool {
        self.width.is_some() && self.height.is_some()
    }
}

/// Space measurement in progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceMeasurement {
    pub width: Option<MeasurementResult>,
    pub depth: Option<MeasurementResult>,
    pub height: Option<MeasurementResult>,
}

impl SpaceMeasurement {
    pub fn is_complete(&self) -> bool {
        self.width.is_some() && self.depth.is_some() && self.height.is_some()
    }
}

/// Measurement set for the active mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PartialMeasurement {
    Door(DoorMeasurement),
    Space(SpaceMeasurement),
    /// Modes without a measurement protocol
    Empty,
}

impl PartialMeasurement {
    /// Fresh, unpopulated measurement for a mode
    pub fn for_mode(mode: MeasurementMode) -> Self {
        match mode {
            MeasurementMode::Door => PartialMeasurement::Door(DoorMeasurement::default()),
            MeasurementMode::Space => PartialMeasurement::Space(SpaceMeasurement::default()),
            MeasurementMode::VirtualPlacement => PartialMeasurement::Empty,
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            PartialMeasurement::Door(door) => door.is_complete(),
            PartialMeasurement::Space(space) => space.is_complete(),
            PartialMeasurement::Empty => false,
        }
    }

    /// Store a result under its dimension. Dimensions the mode doesn't track
    /// are ignored.
    pub fn record(&mut self, result: MeasurementResult) {
        match (self, result.dimension) {
            (PartialMeasurement::Door(door), Dimension::Width) => door.width = Some(result),
            (PartialMeasurement::Door(door), Dimension::Height) => door.height = Some(result),
            (PartialMeasurement::Space(space), Dimension::Width) => space.width = Some(result),
            (PartialMeasurement::Space(space), Dimension::Depth) => space.depth = Some(result),
            (PartialMeasurement::Space(space), Dimension::Height) => space.height = Some(result),
            _ => {}
        }
    }

    pub fn get(&self, dimension: Dimension) -> Option<&MeasurementResult> {
        match (self, dimension) {
            (PartialMeasurement::Door(door), Dimension::Width) => door.width.as_ref(),
            (PartialMeasurement::Door(door), Dimension::Height) => door.height.as_ref(),
            (PartialMeasurement::Space(space), Dimension::Width) => space.width.as_ref(),
            (PartialMeasurement::Space(space), Dimension::Depth) => space.depth.as_ref(),
            (PartialMeasurement::Space(space), Dimension::Height) => space.height.as_ref(),
            _ => None,
        }
    }
}
