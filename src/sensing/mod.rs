// SPDX-License-Identifier: GPL-3.0-only

//! Spatial sensing boundary
//!
//! The tracking subsystem itself is external. This module holds the
//! contract it has to satisfy ([`SensingSource`]) plus everything layered on
//! top of it:
//!
//! - [`classifier`]: raw hit → [`HitQuality`] tier
//! - [`raycast`]: priority selection among hit candidates
//! - [`sampler`]: time-windowed sampling into a [`StabilizedPoint`]
//! - [`replay`]: scripted source for replays and tests
//!
//! [`StabilizedPoint`]: crate::measurement::StabilizedPoint

pub mod classifier;
pub mod raycast;
pub mod replay;
pub mod sampler;

use crate::measurement::{Alignment, HitQuality};
use glam::DVec3;
use serde::{Deserialize, Serialize};

pub use classifier::classify;
pub use raycast::select_priority_hit;
pub use replay::{Scenario, ScriptedFrame, ScriptedSource, TapScript};
pub use sampler::{CancelToken, PointSampler, SampleRequest, SamplingEvent, SamplingStream};

/// Screen-space location of a tap, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The tracker's confidence in its own device pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackingQuality {
    #[default]
    Good,
    Degraded,
    Stopped,
}

impl TrackingQuality {
    /// Numeric tracking confidence stamped onto captured points
    pub fn confidence(&self) -> f64 {
        match self {
            TrackingQuality::Good => 1.0,
            TrackingQuality::Degraded => 0.5,
            TrackingQuality::Stopped => 0.0,
        }
    }

    pub fn is_good(&self) -> bool {
        matches!(self, TrackingQuality::Good)
    }
}

/// Orientation of a detected plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneOrientation {
    HorizontalUpward,
    HorizontalDownward,
    Vertical,
}

/// What a raw hit landed on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trackable {
    /// Detected plane; `in_polygon` when the hit lies inside its bounded geometry
    Plane {
        orientation: PlaneOrientation,
        in_polygon: bool,
    },
    /// Depth-sensor point
    DepthPoint,
    /// Visual feature point
    FeaturePoint,
    /// Anything else the tracker reports
    Other,
}

impl Trackable {
    pub fn is_plane(&self) -> bool {
        matches!(self, Trackable::Plane { .. })
    }

    /// Plane hit inside reconstructed geometry
    pub fn is_plane_geometry(&self) -> bool {
        matches!(self, Trackable::Plane { in_polygon: true, .. })
    }
}

/// One raw candidate returned by a hit test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitCandidate {
    /// World-space position in meters
    pub position: DVec3,
    pub trackable: Trackable,
}

impl HitCandidate {
    pub fn new(position: DVec3, trackable: Trackable) -> Self {
        Self {
            position,
            trackable,
        }
    }
}

/// Selected, classified hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub position: DVec3,
    pub quality: HitQuality,
}

/// Contract for the external spatial-tracking subsystem
///
/// Both methods are polled once per sample tick and must return quickly.
pub trait SensingSource: Send + Sync {
    /// Current tracking quality
    fn tracking_quality(&self) -> TrackingQuality;

    /// All raw hit candidates under a screen location, in tracker order
    fn hit_test(&self, anchor: ScreenPoint) -> Vec<HitCandidate>;

    /// Best hit under `anchor` for an alignment preference
    ///
    /// The default applies [`select_priority_hit`] to [`Self::hit_test`] and
    /// classifies the winner. In strict mode only hits inside plane geometry
    /// are returned.
    fn priority_hit_test(
        &self,
        anchor: ScreenPoint,
        alignment: Alignment,
        strict: bool,
    ) -> Option<Hit> {
        let candidates = self.hit_test(anchor);
        select_priority_hit(&candidates, alignment, strict).map(|candidate| Hit {
            position: candidate.position,
            quality: classify(&candidate.trackable),
        })
    }
}
