// SPDX-License-Identifier: GPL-3.0-only

//! Measurement flow controller
//!
//! Walks the user through the tap protocol of a [`MeasurementMode`]. The
//! machine itself is the pure [`transition`] function over [`FlowState`];
//! [`FlowController`] is a small owner around it for callers that just want
//! to push points in and read snapshots back.
//!
//! Door: bottom-left, bottom-right (width), top-left (height from
//! bottom-left). Space: left/right walls (width), front/back walls (depth),
//! floor/ceiling (height).

use super::result::{MeasurementKind, measure_with_base};
use super::types::{
    Alignment, Dimension, MeasurementMode, MeasurementResult, PartialMeasurement, StabilizedPoint,
};
use crate::config::FlowConfig;
use crate::constants::CM_PER_M;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// One step of a measurement protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProtocolStep {
    DoorBottomLeft,
    DoorBottomRight,
    DoorTopLeft,
    SpaceWidthLeft,
    SpaceWidthRight,
    SpaceDepthFront,
    SpaceDepthBack,
    SpaceHeightFloor,
    SpaceHeightCeiling,
    Complete,
}

/// What a step does with the point it receives
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepAction {
    /// Keep the point for a later step
    Anchor,
    /// Combine with a stored anchor into a measurement
    Measure {
        anchor: ProtocolStep,
        dimension: Dimension,
        kind: MeasurementKind,
        /// Both points must sit at the same height
        level_check: bool,
        /// Drop the anchor afterwards (no later step needs it)
        release_anchor: bool,
    },
    /// Terminal, input ignored
    Ignore,
}

const DOOR_STEPS: [ProtocolStep; 3] = [
    ProtocolStep::DoorBottomLeft,
    ProtocolStep::DoorBottomRight,
    ProtocolStep::DoorTopLeft,
];

const SPACE_STEPS: [ProtocolStep; 6] = [
    ProtocolStep::SpaceWidthLeft,
    ProtocolStep::SpaceWidthRight,
    ProtocolStep::SpaceDepthFront,
    ProtocolStep::SpaceDepthBack,
    ProtocolStep::SpaceHeightFloor,
    ProtocolStep::SpaceHeightCeiling,
];

impl ProtocolStep {
    /// Ordered steps of a mode's protocol
    pub fn steps(mode: MeasurementMode) -> &'static [ProtocolStep] {
        match mode {
            MeasurementMode::Door => &DOOR_STEPS,
            MeasurementMode::Space => &SPACE_STEPS,
            MeasurementMode::VirtualPlacement => &[],
        }
    }

    /// Initial step of a mode
    pub fn first(mode: MeasurementMode) -> ProtocolStep {
        Self::steps(mode)
            .first()
            .copied()
            .unwrap_or(ProtocolStep::Complete)
    }

    /// Step that follows this one
    pub fn next(&self) -> ProtocolStep {
        match self {
            ProtocolStep::DoorBottomLeft => ProtocolStep::DoorBottomRight,
            ProtocolStep::DoorBottomRight => ProtocolStep::DoorTopLeft,
            ProtocolStep::DoorTopLeft => ProtocolStep::Complete,
            ProtocolStep::SpaceWidthLeft => ProtocolStep::SpaceWidthRight,
            ProtocolStep::SpaceWidthRight => ProtocolStep::SpaceDepthFront,
            ProtocolStep::SpaceDepthFront => ProtocolStep::SpaceDepthBack,
            ProtocolStep::SpaceDepthBack => ProtocolStep::SpaceHeightFloor,
            ProtocolStep::SpaceHeightFloor => ProtocolStep::SpaceHeightCeiling,
            ProtocolStep::SpaceHeightCeiling => ProtocolStep::Complete,
            ProtocolStep::Complete => ProtocolStep::Complete,
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            ProtocolStep::DoorBottomLeft => "Tap BOTTOM-LEFT corner of door",
            ProtocolStep::DoorBottomRight => "Tap BOTTOM-RIGHT corner of door",
            ProtocolStep::DoorTopLeft => "Tap TOP-LEFT corner of door",
            ProtocolStep::SpaceWidthLeft => "Tap LEFT wall",
            ProtocolStep::SpaceWidthRight => "Tap RIGHT wall",
            ProtocolStep::SpaceDepthFront => "Tap FRONT wall",
            ProtocolStep::SpaceDepthBack => "Tap BACK wall",
            ProtocolStep::SpaceHeightFloor => "Tap FLOOR",
            ProtocolStep::SpaceHeightCeiling => "Tap CEILING",
            ProtocolStep::Complete => "Measurement complete!",
        }
    }

    pub fn alignment(&self) -> Alignment {
        match self {
            ProtocolStep::DoorBottomLeft
            | ProtocolStep::DoorBottomRight
            | ProtocolStep::SpaceHeightFloor => Alignment::Horizontal,
            ProtocolStep::DoorTopLeft
            | ProtocolStep::SpaceWidthLeft
            | ProtocolStep::SpaceWidthRight
            | ProtocolStep::SpaceDepthFront
            | ProtocolStep::SpaceDepthBack => Alignment::Vertical,
            ProtocolStep::SpaceHeightCeiling | ProtocolStep::Complete => Alignment::Any,
        }
    }

    /// Whether the tap must land on real plane geometry
    pub fn requires_plane(&self) -> bool {
        matches!(
            self,
            ProtocolStep::DoorBottomLeft
                | ProtocolStep::DoorBottomRight
                | ProtocolStep::SpaceHeightFloor
        )
    }

    pub fn action(&self) -> StepAction {
        match self {
            ProtocolStep::DoorBottomLeft
            | ProtocolStep::SpaceWidthLeft
            | ProtocolStep::SpaceDepthFront
            | ProtocolStep::SpaceHeightFloor => StepAction::Anchor,
            ProtocolStep::DoorBottomRight => StepAction::Measure {
                anchor: ProtocolStep::DoorBottomLeft,
                dimension: Dimension::Width,
                kind: MeasurementKind::Horizontal,
                level_check: true,
                // Height is taken from the bottom-left corner too
                release_anchor: false,
            },
            ProtocolStep::DoorTopLeft => StepAction::Measure {
                anchor: ProtocolStep::DoorBottomLeft,
                dimension: Dimension::Height,
                kind: MeasurementKind::Vertical,
                level_check: false,
                release_anchor: true,
            },
            ProtocolStep::SpaceWidthRight => StepAction::Measure {
                anchor: ProtocolStep::SpaceWidthLeft,
                dimension: Dimension::Width,
                kind: MeasurementKind::Horizontal,
                level_check: false,
                release_anchor: true,
            },
            ProtocolStep::SpaceDepthBack => StepAction::Measure {
                anchor: ProtocolStep::SpaceDepthFront,
                dimension: Dimension::Depth,
                kind: MeasurementKind::Horizontal,
                level_check: false,
                release_anchor: true,
            },
            ProtocolStep::SpaceHeightCeiling => StepAction::Measure {
                anchor: ProtocolStep::SpaceHeightFloor,
                dimension: Dimension::Height,
                kind: MeasurementKind::Vertical,
                level_check: false,
                release_anchor: true,
            },
            ProtocolStep::Complete => StepAction::Ignore,
        }
    }
}

/// Complete state of one measurement run
#[derive(Debug, Clone, PartialEq)]
pub struct FlowState {
    pub mode: MeasurementMode,
    pub step: ProtocolStep,
    pub measurement: PartialMeasurement,
    /// Points waiting for their partner step
    anchors: BTreeMap<ProtocolStep, StabilizedPoint>,
    pub consistency_error: Option<String>,
    pub complete: bool,
}

impl FlowState {
    /// Initial state for a mode
    pub fn new(mode: MeasurementMode) -> Self {
        Self {
            mode,
            step: ProtocolStep::first(mode),
            measurement: PartialMeasurement::for_mode(mode),
            anchors: BTreeMap::new(),
            consistency_error: None,
            complete: false,
        }
    }

    /// Anchor point stored by `step`, if any
    pub fn anchor(&self, step: ProtocolStep) -> Option<&StabilizedPoint> {
        self.anchors.get(&step)
    }
}

/// Input to the flow state machine
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    /// (Re)start with a mode
    Start(MeasurementMode),
    /// Restart the current mode
    Reset,
    /// A stabilized point for the current step
    Point(StabilizedPoint),
    /// Dismiss a pending consistency error
    ClearConsistencyError,
}

/// Observable outcome of a transition
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEffect {
    StepChanged(ProtocolStep),
    Recorded(MeasurementResult),
    /// Door bottom corners were not level; both were discarded
    LevelRejected { difference_cm: f64, message: String },
    Completed,
}

/// Advance the flow state machine by one event
pub fn transition(
    mut state: FlowState,
    event: FlowEvent,
    config: &FlowConfig,
) -> (FlowState, Vec<FlowEffect>) {
    let mut effects = Vec::new();

    match event {
        FlowEvent::Start(mode) => {
            state = FlowState::new(mode);
            effects.push(FlowEffect::StepChanged(state.step));
        }
        FlowEvent::Reset => {
            state = FlowState::new(state.mode);
            effects.push(FlowEffect::StepChanged(state.step));
        }
        FlowEvent::ClearConsistencyError => {
            state.consistency_error = None;
        }
        FlowEvent::Point(point) => apply_point(&mut state, point, config, &mut effects),
    }

    (state, effects)
}

fn apply_point(
    state: &mut FlowState,
    point: StabilizedPoint,
    config: &FlowConfig,
    effects: &mut Vec<FlowEffect>,
) {
    let step = state.step;

    match step.action() {
        StepAction::Ignore => {
            debug!(?step, "Point received after completion, ignoring");
        }
        StepAction::Anchor => {
            state.anchors.insert(step, point);
            advance(state, effects);
        }
        StepAction::Measure {
            anchor,
            dimension,
            kind,
            level_check,
            release_anchor,
        } => {
            let Some(from) = state.anchors.get(&anchor).copied() else {
                warn!(?step, ?anchor, "No anchor point stored, ignoring point");
                return;
            };

            if level_check {
                let difference_m = (from.position.y - point.position.y).abs();
                if difference_m > config.level_threshold_m {
                    let difference_cm = difference_m * CM_PER_M;
                    let message = format!(
                        "Bottom points not level ({}cm difference). Re-tap both corners on flat floor.",
                        difference_cm as i64
                    );
                    warn!(difference_cm, "Rejecting non-level bottom corners");

                    state.anchors.remove(&anchor);
                    state.consistency_error = Some(message.clone());
                    state.step = anchor;
                    effects.push(FlowEffect::LevelRejected {
                        difference_cm,
                        message,
                    });
                    effects.push(FlowEffect::StepChanged(anchor));
                    return;
                }
                state.consistency_error = None;
            }

            let result =
                measure_with_base(dimension, kind, &from, &point, config.base_uncertainty_cm);
            info!(
                %dimension,
                value_cm = result.value_cm,
                uncertainty_cm = result.uncertainty_cm,
                confidence = result.confidence,
                "Measurement recorded"
            );

            if release_anchor {
                state.anchors.remove(&anchor);
            }
            state.measurement.record(result.clone());
            effects.push(FlowEffect::Recorded(result));
            advance(state, effects);
        }
    }
}

fn advance(state: &mut FlowState, effects: &mut Vec<FlowEffect>) {
    state.step = state.step.next();
    debug!(step = ?state.step, "Advanced to next step");
    effects.push(FlowEffect::StepChanged(state.step));

    if state.step == ProtocolStep::Complete {
        state.complete = true;
        state.anchors.clear();
        info!(mode = ?state.mode, "Measurement run complete");
        effects.push(FlowEffect::Completed);
    }
}

/// Read-only view of the controller after an update
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSnapshot {
    pub current_step: ProtocolStep,
    pub measurement: PartialMeasurement,
    pub consistency_error: Option<String>,
    pub is_complete: bool,
}

/// Owner of one [`FlowState`]
#[derive(Debug, Clone)]
pub struct FlowController {
    state: FlowState,
    config: FlowConfig,
}

impl Default for FlowController {
    fn default() -> Self {
        Self::new(FlowConfig::default())
    }
}

impl FlowController {
    /// Controller starting in door mode
    pub fn new(config: FlowConfig) -> Self {
        Self {
            state: FlowState::new(MeasurementMode::Door),
            config,
        }
    }

    /// Feed an event through the state machine
    pub fn handle(&mut self, event: FlowEvent) -> Vec<FlowEffect> {
        let placeholder = FlowState::new(self.state.mode);
        let state = std::mem::replace(&mut self.state, placeholder);
        let (state, effects) = transition(state, event, &self.config);
        self.state = state;
        effects
    }

    pub fn start_flow(&mut self, mode: MeasurementMode) -> FlowSnapshot {
        self.handle(FlowEvent::Start(mode));
        self.snapshot()
    }

    pub fn reset(&mut self) -> FlowSnapshot {
        self.handle(FlowEvent::Reset);
        self.snapshot()
    }

    pub fn submit_point(&mut self, point: StabilizedPoint) -> FlowSnapshot {
        self.handle(FlowEvent::Point(point));
        self.snapshot()
    }

    pub fn clear_consistency_error(&mut self) {
        self.handle(FlowEvent::ClearConsistencyError);
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            current_step: self.state.step,
            measurement: self.state.measurement.clone(),
            consistency_error: self.state.consistency_error.clone(),
            is_complete: self.state.complete,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn mode(&self) -> MeasurementMode {
        self.state.mode
    }

    pub fn current_step(&self) -> ProtocolStep {
        self.state.step
    }

    pub fn measurement(&self) -> &PartialMeasurement {
        &self.state.measurement
    }

    pub fn is_complete(&self) -> bool {
        self.state.complete
    }
}
