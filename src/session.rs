// SPDX-License-Identifier: GPL-3.0-only

//! Measurement session
//!
//! Glues the point sampler, the flow controller and the verdict engine into
//! one run the way a measuring screen drives them: a tap samples a point for
//! the current step, the point is fed to the flow, and a verdict is produced
//! once the flow completes.
//!
//! Taps are refused while a sample is in flight, after the run is complete,
//! or when tracking is not good.

use crate::catalog::Product;
use crate::config::{Config, VerdictConfig};
use crate::errors::{SamplingError, SessionError};
use crate::measurement::{
    FlowController, FlowSnapshot, MeasurementMode, PartialMeasurement, ProtocolStep,
    StabilizedPoint,
};
use crate::sensing::{
    PointSampler, SampleRequest, SamplingEvent, SamplingStream, Scenario, ScreenPoint,
    ScriptedSource, SensingSource,
};
use crate::verdict::{self, Verdict};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sampling status shown alongside the current step
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SamplingState {
    #[default]
    Idle,
    /// In flight, with progress in [0, 1]
    Sampling(f64),
    /// Last tap failed; the message is user-facing
    Failed(String),
}

impl SamplingState {
    pub fn is_sampling(&self) -> bool {
        matches!(self, SamplingState::Sampling(_))
    }
}

/// Everything a UI needs to render the session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub mode: MeasurementMode,
    pub flow: FlowSnapshot,
    pub instruction: &'static str,
    pub sampling: SamplingState,
    pub verdict: Option<Verdict>,
    pub rotation_hint: bool,
}

pub struct MeasurementSession<S: SensingSource + ?Sized + 'static> {
    sampler: PointSampler<S>,
    flow: FlowController,
    verdict_config: VerdictConfig,
    product: Option<Product>,
    sampling: SamplingState,
    verdict: Option<Verdict>,
    rotation_hint: bool,
}

impl<S: SensingSource + ?Sized + 'static> MeasurementSession<S> {
    pub fn new(source: Arc<S>, config: &Config) -> Self {
        Self {
            sampler: PointSampler::new(source, config.sampling.clone()),
            flow: FlowController::new(config.flow.clone()),
            verdict_config: config.verdict.clone(),
            product: None,
            sampling: SamplingState::Idle,
            verdict: None,
            rotation_hint: false,
        }
    }

    pub fn source(&self) -> &Arc<S> {
        self.sampler.source()
    }

    /// Product to judge against; re-evaluates a completed run
    pub fn set_product(&mut self, product: Option<Product>) {
        self.product = product;
        self.refresh_verdict();
    }

    pub fn product(&self) -> Option<&Product> {
        self.product.as_ref()
    }

    /// Start a fresh run in `mode`
    pub fn start(&mut self, mode: MeasurementMode) -> SessionSnapshot {
        self.sampler.cancel();
        self.flow.start_flow(mode);
        self.clear_outcome();
        info!(?mode, "Measurement session started");
        self.snapshot()
    }

    /// Restart the current mode from its first step
    pub fn reset(&mut self) -> SessionSnapshot {
        self.sampler.cancel();
        self.flow.reset();
        self.clear_outcome();
        debug!(mode = ?self.flow.mode(), "Measurement session reset");
        self.snapshot()
    }

    /// Abort the in-flight sample, keeping recorded measurements
    pub fn cancel_sampling(&mut self) {
        self.sampler.cancel();
        if self.sampling.is_sampling() {
            debug!(step = ?self.flow.current_step(), "Sampling cancelled");
            self.sampling = SamplingState::Idle;
        }
    }

    pub fn clear_consistency_error(&mut self) {
        self.flow.clear_consistency_error();
    }

    /// Check the tap gates and start sampling for the current step
    ///
    /// The caller drives the returned stream and reports back through
    /// [`Self::update_progress`] and [`Self::finish_tap`].
    pub fn begin_tap(&mut self, anchor: ScreenPoint) -> Result<SamplingStream, SessionError> {
        if self.sampling.is_sampling() {
            if self.sampler.is_active() {
                return Err(SessionError::AlreadySampling);
            }
            // The caller stopped driving the last run before it finished
            debug!("Previous sampling run abandoned");
            self.sampling = SamplingState::Idle;
        }
        let step = self.flow.current_step();
        if self.flow.is_complete() || step == ProtocolStep::Complete {
            return Err(SessionError::RunComplete);
        }
        let tracking = self.sampler.source().tracking_quality();
        if !tracking.is_good() {
            debug!(?tracking, "Tap ignored, tracking not ready");
            return Err(SessionError::TrackingNotReady);
        }

        self.flow.clear_consistency_error();
        self.sampling = SamplingState::Sampling(0.0);

        debug!(?step, ?anchor, "Tap accepted");
        Ok(self.sampler.start_sampling(SampleRequest {
            anchor,
            alignment: step.alignment(),
            require_plane: step.requires_plane(),
        }))
    }

    pub fn update_progress(&mut self, progress: f64) {
        if self.sampling.is_sampling() {
            self.sampling = SamplingState::Sampling(progress.clamp(0.0, 1.0));
        }
    }

    /// Apply the terminal outcome of a sample; `None` means it was cancelled
    pub fn finish_tap(
        &mut self,
        outcome: Option<Result<StabilizedPoint, SamplingError>>,
    ) -> Result<SessionSnapshot, SessionError> {
        match outcome {
            Some(Ok(point)) => {
                let flow = self.flow.submit_point(point);
                self.sampling = match flow.consistency_error {
                    Some(error) => SamplingState::Failed(error),
                    None => SamplingState::Idle,
                };
                if flow.is_complete {
                    self.refresh_verdict();
                }
                Ok(self.snapshot())
            }
            Some(Err(err)) => {
                warn!(step = ?self.flow.current_step(), error = %err, "Tap failed");
                self.sampling = SamplingState::Failed(err.to_string());
                Ok(self.snapshot())
            }
            None => {
                self.sampling = SamplingState::Idle;
                Err(SessionError::SamplingAborted)
            }
        }
    }

    /// Sample a point for the current step and feed it to the flow
    ///
    /// A sampling failure is not an error here: it lands in
    /// [`SessionSnapshot::sampling`] and the same step can be tapped again.
    pub async fn tap(&mut self, anchor: ScreenPoint) -> Result<SessionSnapshot, SessionError> {
        let mut stream = self.begin_tap(anchor)?;

        while let Some(event) = stream.next().await {
            match event {
                SamplingEvent::Progress(p) => self.update_progress(p),
                SamplingEvent::Complete(point) => return self.finish_tap(Some(Ok(point))),
                SamplingEvent::Failed(err) => return self.finish_tap(Some(Err(err))),
            }
        }
        self.finish_tap(None)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let flow = self.flow.snapshot();
        let sampling = match &self.sampling {
            SamplingState::Sampling(_) if !self.sampler.is_active() => SamplingState::Idle,
            state => state.clone(),
        };
        SessionSnapshot {
            mode: self.flow.mode(),
            instruction: flow.current_step.instruction(),
            flow,
            sampling,
            verdict: self.verdict.clone(),
            rotation_hint: self.rotation_hint,
        }
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    pub fn measurement(&self) -> &PartialMeasurement {
        self.flow.measurement()
    }

    fn clear_outcome(&mut self) {
        self.sampling = SamplingState::Idle;
        self.verdict = None;
        self.rotation_hint = false;
    }

    fn refresh_verdict(&mut self) {
        let (Some(product), true) = (self.product.as_ref(), self.flow.is_complete()) else {
            self.verdict = None;
            self.rotation_hint = false;
            return;
        };

        let measurement = self.flow.measurement();
        let verdict = verdict::evaluate(measurement, product, &self.verdict_config);
        self.rotation_hint = match measurement {
            PartialMeasurement::Door(door) => {
                verdict::suggest_rotation(door, product, &self.verdict_config)
            }
            _ => false,
        };
        info!(
            product = %product.id,
            verdict = verdict.title(),
            reason = verdict.reason(),
            rotation_hint = self.rotation_hint,
            "Verdict ready"
        );
        self.verdict = Some(verdict);
    }
}

/// Outcome of one replayed tap
#[derive(Debug, Clone, PartialEq)]
pub struct TapRecord {
    pub step: ProtocolStep,
    pub result: Result<SessionSnapshot, SessionError>,
}

/// Result of replaying a whole scenario
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub taps: Vec<TapRecord>,
    pub final_state: SessionSnapshot,
}

/// Play a recorded scenario through a fresh session
pub async fn replay_scenario(
    scenario: &Scenario,
    product: Option<Product>,
    config: &Config,
) -> ReplayReport {
    let source = Arc::new(ScriptedSource::default());
    let mut session = MeasurementSession::new(Arc::clone(&source), config);
    session.start(scenario.mode);
    session.set_product(product);

    let mut taps = Vec::with_capacity(scenario.taps.len());
    for tap in &scenario.taps {
        let step = session.snapshot().flow.current_step;
        source.load(tap.clone());
        let result = session.tap(tap.anchor).await;
        if let Err(e) = &result {
            debug!(?step, error = %e, "Replayed tap refused");
        }
        taps.push(TapRecord { step, result });
    }

    ReplayReport {
        taps,
        final_state: session.snapshot(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::{
        HitCandidate, PlaneOrientation, ScriptedFrame, TapScript, Trackable, TrackingQuality,
    };
    use glam::DVec3;
    use std::time::Duration;

    fn floor(x: f64, y: f64) -> TapScript {
        TapScript::steady(HitCandidate::new(
            DVec3::new(x, y, 0.0),
            Trackable::Plane {
                orientation: PlaneOrientation::HorizontalUpward,
                in_polygon: true,
            },
        ))
    }

    fn wall(x: f64, y: f64) -> TapScript {
        TapScript::steady(HitCandidate::new(
            DVec3::new(x, y, 0.0),
            Trackable::Plane {
                orientation: PlaneOrientation::Vertical,
                in_polygon: true,
            },
        ))
    }

    fn session() -> (Arc<ScriptedSource>, MeasurementSession<ScriptedSource>) {
        let source = Arc::new(ScriptedSource::default());
        let session = MeasurementSession::new(Arc::clone(&source), &Config::default());
        (source, session)
    }

    #[tokio::test(start_paused = true)]
    async fn test_door_run_produces_verdict() {
        let (source, mut session) = session();
        session.start(MeasurementMode::Door);
        session.set_product(Some(Product::with_dimensions(90.0, 200.0, 60.0)));

        for script in [floor(0.0, 0.0), floor(1.0, 0.0), wall(0.0, 2.1)] {
            source.load(script);
            let snapshot = session.tap(ScreenPoint::default()).await.unwrap();
            assert_eq!(snapshot.sampling, SamplingState::Idle);
        }

        let snapshot = session.snapshot();
        assert!(snapshot.flow.is_complete);
        assert_eq!(
            snapshot.verdict,
            Some(Verdict::Pass("Product fits with 10cm clearance".to_string()))
        );
        assert!(!snapshot.rotation_hint);

        assert_eq!(
            session.tap(ScreenPoint::default()).await,
            Err(SessionError::RunComplete)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tap_refused_without_tracking() {
        let (source, mut session) = session();
        source.load(TapScript {
            anchor: ScreenPoint::default(),
            frames: vec![ScriptedFrame::empty(TrackingQuality::Degraded)],
        });
        assert_eq!(
            session.tap(ScreenPoint::default()).await.unwrap_err(),
            SessionError::TrackingNotReady
        );
        assert_eq!(session.snapshot().flow.current_step, ProtocolStep::DoorBottomLeft);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tap_keeps_step() {
        let (source, mut session) = session();
        source.load(wall(0.0, 0.0));

        let snapshot = session.tap(ScreenPoint::default()).await.unwrap();
        assert_eq!(
            snapshot.sampling,
            SamplingState::Failed(
                "No floor plane detected. Scan the floor slowly, then tap again.".to_string()
            )
        );
        assert_eq!(snapshot.flow.current_step, ProtocolStep::DoorBottomLeft);

        // A failure doesn't block the next tap
        source.load(floor(0.0, 0.0));
        let snapshot = session.tap(ScreenPoint::default()).await.unwrap();
        assert_eq!(snapshot.flow.current_step, ProtocolStep::DoorBottomRight);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uneven_corners_reported_as_failure() {
        let (source, mut session) = session();
        source.load(floor(0.0, 0.0));
        session.tap(ScreenPoint::default()).await.unwrap();

        source.load(floor(1.0, 0.05));
        let snapshot = session.tap(ScreenPoint::default()).await.unwrap();
        assert!(matches!(
            &snapshot.sampling,
            SamplingState::Failed(reason) if reason.starts_with("Bottom points not level")
        ));
        assert_eq!(snapshot.flow.current_step, ProtocolStep::DoorBottomLeft);

        // The next tap clears the error
        source.load(floor(0.0, 0.0));
        let snapshot = session.tap(ScreenPoint::default()).await.unwrap();
        assert_eq!(snapshot.flow.consistency_error, None);
        assert_eq!(snapshot.sampling, SamplingState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_tap_does_not_block_next_tap() {
        let (source, mut session) = session();
        source.load(floor(0.0, 0.0));

        let abandoned =
            tokio::time::timeout(Duration::from_millis(100), session.tap(ScreenPoint::default()))
                .await;
        assert!(abandoned.is_err());
        assert_eq!(session.snapshot().sampling, SamplingState::Idle);

        // Same for a stream dropped without reporting back
        drop(session.begin_tap(ScreenPoint::default()).unwrap());
        assert_eq!(session.snapshot().sampling, SamplingState::Idle);

        let snapshot = session.tap(ScreenPoint::default()).await.unwrap();
        assert_eq!(snapshot.sampling, SamplingState::Idle);
        assert_eq!(snapshot.flow.current_step, ProtocolStep::DoorBottomRight);
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_tap_rejects_second_tap() {
        let (source, mut session) = session();
        source.load(floor(0.0, 0.0));

        let stream = session.begin_tap(ScreenPoint::default()).unwrap();
        assert!(matches!(
            session.begin_tap(ScreenPoint::default()),
            Err(SessionError::AlreadySampling)
        ));

        session.cancel_sampling();
        assert_eq!(session.snapshot().sampling, SamplingState::Idle);
        assert_eq!(stream.finish(|_| {}).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_and_product_change() {
        let (source, mut session) = session();
        session.start(MeasurementMode::Door);
        for script in [floor(0.0, 0.0), floor(1.0, 0.0), wall(0.0, 2.1)] {
            source.load(script);
            session.tap(ScreenPoint::default()).await.unwrap();
        }
        assert_eq!(session.verdict(), None);

        let mut tv = Product::with_dimensions(145.0, 83.0, 5.0);
        tv.allow_rotate = true;
        session.set_product(Some(tv));
        assert!(session.verdict().is_some_and(Verdict::is_pass));
        assert!(session.snapshot().rotation_hint);

        let snapshot = session.reset();
        assert_eq!(snapshot.flow.current_step, ProtocolStep::DoorBottomLeft);
        assert_eq!(snapshot.verdict, None);
        assert!(!snapshot.rotation_hint);
    }
}
