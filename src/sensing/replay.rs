// SPDX-License-Identifier: GPL-3.0-only

//! Scripted sensing source
//!
//! Plays back recorded (or hand-written) tracker frames so the whole
//! pipeline can run without a device. Frames advance with the tokio clock
//! at `frame_interval`, so under a paused test runtime each sampler tick
//! sees exactly one frame. The last frame of a script repeats forever.

use super::{HitCandidate, ScreenPoint, SensingSource, TrackingQuality};
use crate::constants::SAMPLE_INTERVAL;
use crate::errors::{AppError, AppResult};
use crate::measurement::MeasurementMode;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// One tracker frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedFrame {
    #[serde(default)]
    pub tracking: TrackingQuality,
    #[serde(default)]
    pub candidates: Vec<HitCandidate>,
}

impl ScriptedFrame {
    /// Good tracking with a single candidate
    pub fn hit(candidate: HitCandidate) -> Self {
        Self {
            tracking: TrackingQuality::Good,
            candidates: vec![candidate],
        }
    }

    /// Frame with the given tracking quality and nothing under the anchor
    pub fn empty(tracking: TrackingQuality) -> Self {
        Self {
            tracking,
            candidates: Vec::new(),
        }
    }
}

/// Frames to play for one tap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TapScript {
    #[serde(default)]
    pub anchor: ScreenPoint,
    pub frames: Vec<ScriptedFrame>,
}

impl TapScript {
    /// The same candidate on every frame
    pub fn steady(candidate: HitCandidate) -> Self {
        Self {
            anchor: ScreenPoint::default(),
            frames: vec![ScriptedFrame::hit(candidate)],
        }
    }

    /// A candidate wobbling around `candidate.position` by up to `jitter_m`
    /// per axis, cycling through a fixed pattern
    pub fn jittered(candidate: HitCandidate, jitter_m: f64, frames: usize) -> Self {
        const PATTERN: [(f64, f64, f64); 4] =
            [(1.0, 0.0, -1.0), (-1.0, 1.0, 0.0), (0.0, -1.0, 1.0), (0.0, 0.0, 0.0)];

        let frames = (0..frames.max(1))
            .map(|i| {
                let (dx, dy, dz) = PATTERN[i % PATTERN.len()];
                let offset = DVec3::new(dx, dy, dz) * jitter_m;
                ScriptedFrame::hit(HitCandidate::new(
                    candidate.position + offset,
                    candidate.trackable,
                ))
            })
            .collect();

        Self {
            anchor: ScreenPoint::default(),
            frames,
        }
    }

    pub fn with_anchor(mut self, anchor: ScreenPoint) -> Self {
        self.anchor = anchor;
        self
    }

    /// Frame in effect `index` frames after the script started
    pub fn frame(&self, index: usize) -> Option<&ScriptedFrame> {
        self.frames.get(index).or_else(|| self.frames.last())
    }
}

struct Playback {
    script: TapScript,
    started: Instant,
}

/// [`SensingSource`] that plays back [`TapScript`]s
pub struct ScriptedSource {
    playback: Mutex<Playback>,
    frame_interval: Duration,
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new(TapScript::default())
    }
}

impl ScriptedSource {
    pub fn new(script: TapScript) -> Self {
        Self::with_frame_interval(script, SAMPLE_INTERVAL)
    }

    pub fn with_frame_interval(script: TapScript, frame_interval: Duration) -> Self {
        Self {
            playback: Mutex::new(Playback {
                script,
                started: Instant::now(),
            }),
            frame_interval,
        }
    }

    /// Replace the script and restart playback from its first frame
    pub fn load(&self, script: TapScript) {
        debug!(frames = script.frames.len(), "Loading tap script");
        let mut playback = self.playback.lock().unwrap_or_else(PoisonError::into_inner);
        playback.script = script;
        playback.started = Instant::now();
    }

    fn current_frame(&self) -> ScriptedFrame {
        let playback = self.playback.lock().unwrap_or_else(PoisonError::into_inner);
        let interval = self.frame_interval.as_nanos().max(1);
        let index = (playback.started.elapsed().as_nanos() / interval) as usize;
        playback
            .script
            .frame(index)
            .cloned()
            .unwrap_or_else(|| ScriptedFrame::empty(TrackingQuality::Stopped))
    }
}

impl SensingSource for ScriptedSource {
    fn tracking_quality(&self) -> TrackingQuality {
        self.current_frame().tracking
    }

    fn hit_test(&self, _anchor: ScreenPoint) -> Vec<HitCandidate> {
        self.current_frame().candidates
    }
}

/// A full recorded measurement run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub mode: MeasurementMode,
    /// Catalog id of the product to evaluate against
    #[serde(default)]
    pub product: Option<String>,
    pub taps: Vec<TapScript>,
}

impl Scenario {
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Other(format!("Failed to read scenario {}: {e}", path.display()))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            AppError::Other(format!("Failed to parse scenario {}: {e}", path.display()))
        })
    }
}
