// SPDX-License-Identifier: GPL-3.0-only

//! Measurement protocol and result model

pub mod flow;
pub mod result;
pub mod types;

pub use flow::{FlowController, FlowEffect, FlowEvent, FlowSnapshot, FlowState, ProtocolStep};
pub use result::{MeasurementKind, measure};
pub use types::{
    Alignment, ConfidenceLevel, Dimension, DoorMeasurement, HitQuality, MeasurementMode,
    MeasurementResult, PartialMeasurement, SpaceMeasurement, StabilizedPoint,
};
