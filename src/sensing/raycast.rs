// SPDX-License-Identifier: GPL-3.0-only

//! Priority hit selection
//!
//! Among candidates that match the alignment preference, in order:
//! 1. a hit inside existing plane geometry
//! 2. a depth-sensor point
//! 3. any feature point or plane
//! 4. the first candidate
//!
//! Strict mode accepts only tier 1.

use super::{HitCandidate, PlaneOrientation, Trackable};
use crate::measurement::Alignment;

/// Whether a trackable is acceptable for an alignment preference.
/// Non-plane hits carry no orientation and always match.
pub fn matches_alignment(trackable: &Trackable, alignment: Alignment) -> bool {
    let Trackable::Plane { orientation, .. } = trackable else {
        return true;
    };

    match alignment {
        Alignment::Any => true,
        Alignment::Horizontal => matches!(
            orientation,
            PlaneOrientation::HorizontalUpward | PlaneOrientation::HorizontalDownward
        ),
        Alignment::Vertical => *orientation == PlaneOrientation::Vertical,
    }
}

/// Pick the best candidate for an alignment preference
pub fn select_priority_hit(
    candidates: &[HitCandidate],
    alignment: Alignment,
    strict: bool,
) -> Option<HitCandidate> {
    let filtered: Vec<&HitCandidate> = candidates
        .iter()
        .filter(|c| matches_alignment(&c.trackable, alignment))
        .collect();

    if filtered.is_empty() {
        // Nothing matches the alignment; lenient mode takes whatever came first
        return if strict {
            None
        } else {
            candidates.first().copied()
        };
    }

    if let Some(hit) = filtered.iter().find(|c| c.trackable.is_plane_geometry()) {
        return Some(**hit);
    }

    if strict {
        return None;
    }

    filtered
        .iter()
        .find(|c| c.trackable == Trackable::DepthPoint)
        .or_else(|| {
            filtered
                .iter()
                .find(|c| matches!(c.trackable, Trackable::FeaturePoint) || c.trackable.is_plane())
        })
        .or_else(|| filtered.first())
        .map(|c| **c)
}
