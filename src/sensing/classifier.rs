// SPDX-License-Identifier: GPL-3.0-only

//! Hit classification

use super::Trackable;
use crate::measurement::HitQuality;

/// Reliability tier of a raw hit
///
/// Plane hits inside the plane polygon are [`HitQuality::ExistingPlane`],
/// depth-sensor points are [`HitQuality::DepthPoint`], everything else
/// (feature points, planes hit outside their polygon) is an
/// [`HitQuality::EstimatedSurface`].
pub fn classify(trackable: &Trackable) -> HitQuality {
    match trackable {
        Trackable::Plane {
            in_polygon: true, ..
        } => HitQuality::ExistingPlane,
        Trackable::DepthPoint => HitQuality::DepthPoint,
        Trackable::Plane {
            in_polygon: false, ..
        }
        | Trackable::FeaturePoint
        | Trackable::Other => HitQuality::EstimatedSurface,
    }
}
