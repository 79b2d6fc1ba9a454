// SPDX-License-Identifier: GPL-3.0-only

//! Point sampler
//!
//! Turns one tap into one [`StabilizedPoint`] by polling the sensing source
//! at a fixed interval for the length of the sampling window, then reducing
//! the accepted samples to their per-axis median.
//!
//! A run ends in exactly one of three ways: a point, a [`SamplingError`], or
//! cancellation. Cancellation is observed at every tick and produces no
//! terminal event at all.
//!
//! # Example
//!
//! ```ignore
//! let mut sampler = PointSampler::new(source, SamplingConfig::default());
//! let mut stream = sampler.start_sampling(SampleRequest {
//!     anchor: ScreenPoint::new(540.0, 1200.0),
//!     alignment: Alignment::Horizontal,
//!     require_plane: true,
//! });
//!
//! while let Some(event) = stream.next().await {
//!     match event {
//!         SamplingEvent::Progress(p) => println!("{:.0}%", p * 100.0),
//!         SamplingEvent::Complete(point) => println!("{:?}", point.position),
//!         SamplingEvent::Failed(err) => println!("{}", err),
//!     }
//! }
//! ```

use super::{ScreenPoint, SensingSource, TrackingQuality};
use crate::config::SamplingConfig;
use crate::constants::CM_PER_M;
use crate::errors::{SamplingError, SurfaceKind};
use crate::measurement::{Alignment, HitQuality, StabilizedPoint};
use futures::Stream;
use glam::DVec3;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// One sampling request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRequest {
    pub anchor: ScreenPoint,
    pub alignment: Alignment,
    /// Only accept hits inside real plane geometry
    pub require_plane: bool,
}

impl SampleRequest {
    fn surface(&self) -> SurfaceKind {
        match self.alignment {
            Alignment::Horizontal => SurfaceKind::Floor,
            _ => SurfaceKind::Wall,
        }
    }
}

/// Event emitted by a sampling run
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingEvent {
    /// Fraction of the window elapsed, in [0, 1]
    Progress(f64),
    Complete(StabilizedPoint),
    Failed(SamplingError),
}

impl SamplingEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SamplingEvent::Progress(_))
    }
}

/// Shared cancellation flag for a sampling run
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
struct PointSample {
    position: DVec3,
    quality: HitQuality,
    timestamp: Instant,
}

/// Outcome of a single tick
enum Tick {
    Accepted,
    Skipped,
    Abort(SamplingError),
}

/// State of one sampling run
pub struct SamplingRun<S: SensingSource + ?Sized> {
    source: Arc<S>,
    config: SamplingConfig,
    request: SampleRequest,
    samples: Vec<PointSample>,
    bad_tracking_frames: u32,
    last_tracking: TrackingQuality,
}

impl<S: SensingSource + ?Sized> SamplingRun<S> {
    pub fn new(source: Arc<S>, config: SamplingConfig, request: SampleRequest) -> Self {
        Self {
            source,
            config,
            request,
            samples: Vec::new(),
            bad_tracking_frames: 0,
            last_tracking: TrackingQuality::Stopped,
        }
    }

    /// Drive the run to completion
    ///
    /// Returns `None` when cancelled. `on_progress` is called after every
    /// tick that doesn't abort the run, including skipped ones.
    pub async fn run(
        mut self,
        cancel: &CancelToken,
        mut on_progress: impl FnMut(f64),
    ) -> Option<Result<StabilizedPoint, SamplingError>> {
        let request = self.request;
        debug!(
            anchor = ?request.anchor,
            alignment = ?request.alignment,
            strict = request.require_plane,
            "Starting point sampling"
        );

        // Fail fast instead of burning the whole window on a missing plane
        if request.require_plane
            && self
                .source
                .priority_hit_test(request.anchor, request.alignment, true)
                .is_none()
        {
            let err = SamplingError::NoPlaneDetected {
                surface: request.surface(),
            };
            warn!(error = %err, "Upfront plane check failed");
            return Some(Err(err));
        }

        let window = self.config.window();
        let interval = self.config.interval();
        let start = Instant::now();

        while start.elapsed() < window {
            if cancel.is_cancelled() {
                debug!("Sampling cancelled");
                return None;
            }

            match self.tick() {
                Tick::Abort(err) => {
                    warn!(error = %err, samples = self.samples.len(), "Sampling aborted");
                    return Some(Err(err));
                }
                Tick::Accepted | Tick::Skipped => {}
            }

            let progress = start.elapsed().as_secs_f64() / window.as_secs_f64();
            on_progress(progress.clamp(0.0, 1.0));

            tokio::time::sleep(interval).await;
        }

        if cancel.is_cancelled() {
            debug!("Sampling cancelled");
            return None;
        }

        let result = self.finish();
        match &result {
            Ok(point) => info!(
                samples = point.sample_count,
                spread_cm = point.spread_cm,
                quality = ?point.quality,
                "Sampling complete"
            ),
            Err(err) => warn!(error = %err, "Sampling failed"),
        }
        Some(result)
    }

    fn tick(&mut self) -> Tick {
        let tracking = self.source.tracking_quality();
        self.last_tracking = tracking;

        if !tracking.is_good() {
            self.bad_tracking_frames += 1;
            if self.bad_tracking_frames > self.config.max_bad_tracking_frames {
                return Tick::Abort(SamplingError::TrackingLost);
            }
            return Tick::Skipped;
        }
        self.bad_tracking_frames = 0;

        let Some(hit) = self.source.priority_hit_test(
            self.request.anchor,
            self.request.alignment,
            self.request.require_plane,
        ) else {
            return Tick::Skipped;
        };

        if self.request.require_plane && hit.quality == HitQuality::EstimatedSurface {
            return Tick::Skipped;
        }

        self.samples.push(PointSample {
            position: hit.position,
            quality: hit.quality,
            timestamp: Instant::now(),
        });
        Tick::Accepted
    }

    fn finish(&self) -> Result<StabilizedPoint, SamplingError> {
        let positions: Vec<DVec3> = self.samples.iter().map(|s| s.position).collect();
        let qualities: Vec<HitQuality> = self.samples.iter().map(|s| s.quality).collect();

        if let (Some(first), Some(last)) = (self.samples.first(), self.samples.last()) {
            debug!(
                samples = self.samples.len(),
                span_ms = last.timestamp.duration_since(first.timestamp).as_millis() as u64,
                "Reducing samples"
            );
        }

        stabilize(
            &positions,
            &qualities,
            &self.config,
            self.request,
            self.last_tracking.confidence(),
        )
    }
}

/// Reduce accepted samples to a single point
///
/// `positions` and `qualities` are parallel slices of the accepted samples.
pub fn stabilize(
    positions: &[DVec3],
    qualities: &[HitQuality],
    config: &SamplingConfig,
    request: SampleRequest,
    tracking_confidence: f64,
) -> Result<StabilizedPoint, SamplingError> {
    if positions.len() < config.min_samples {
        return Err(if request.require_plane {
            SamplingError::PlaneNotReliable {
                surface: request.surface(),
            }
        } else {
            SamplingError::NotEnoughSamples {
                collected: positions.len(),
                required: config.min_samples,
            }
        });
    }

    // Guarded by min_samples above, but min_samples may be configured to 0
    let Some(position) = median_position(positions) else {
        return Err(SamplingError::NotEnoughSamples {
            collected: 0,
            required: config.min_samples.max(1),
        });
    };

    let spread_cm = stability_spread_cm(positions, position);
    if spread_cm > config.max_spread_cm {
        return Err(SamplingError::PositionUnstable { spread_cm });
    }

    let quality = dominant_quality(qualities).unwrap_or(HitQuality::EstimatedSurface);

    Ok(StabilizedPoint {
        position,
        quality,
        spread_cm,
        tracking_confidence,
        sample_count: positions.len(),
    })
}

/// Median of a set of values; mean of the middle pair for even counts
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let middle = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[middle - 1] + values[middle]) / 2.0)
    } else {
        Some(values[middle])
    }
}

/// Per-axis median of a point set
pub fn median_position(positions: &[DVec3]) -> Option<DVec3> {
    let mut xs: Vec<f64> = positions.iter().map(|p| p.x).collect();
    let mut ys: Vec<f64> = positions.iter().map(|p| p.y).collect();
    let mut zs: Vec<f64> = positions.iter().map(|p| p.z).collect();

    Some(DVec3::new(
        median(&mut xs)?,
        median(&mut ys)?,
        median(&mut zs)?,
    ))
}

/// Largest distance of any position from `center`, in centimeters
pub fn stability_spread_cm(positions: &[DVec3], center: DVec3) -> f64 {
    positions
        .iter()
        .map(|p| p.distance(center) * CM_PER_M)
        .fold(0.0, f64::max)
}

/// Most frequent quality; ties go to the one seen first
pub fn dominant_quality(qualities: &[HitQuality]) -> Option<HitQuality> {
    let mut counts: Vec<(HitQuality, usize)> = Vec::new();
    for quality in qualities {
        match counts.iter_mut().find(|(q, _)| q == quality) {
            Some((_, count)) => *count += 1,
            None => counts.push((*quality, 1)),
        }
    }

    let mut best: Option<(HitQuality, usize)> = None;
    for (quality, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((quality, count));
        }
    }
    best.map(|(quality, _)| quality)
}

/// Event stream of one in-flight sampling run
///
/// Dropping the stream cancels the run.
pub struct SamplingStream {
    events: mpsc::UnboundedReceiver<SamplingEvent>,
    cancel: CancelToken,
}

impl SamplingStream {
    /// Cancel the run; no terminal event will be delivered
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the terminal event, forwarding progress to `on_progress`
    ///
    /// Returns `None` if the run was cancelled.
    pub async fn finish(
        mut self,
        mut on_progress: impl FnMut(f64),
    ) -> Option<Result<StabilizedPoint, SamplingError>> {
        while let Some(event) = self.events.recv().await {
            match event {
                SamplingEvent::Progress(p) => on_progress(p),
                SamplingEvent::Complete(point) => return Some(Ok(point)),
                SamplingEvent::Failed(err) => return Some(Err(err)),
            }
        }
        None
    }
}

impl Stream for SamplingStream {
    type Item = SamplingEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

impl Drop for SamplingStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The run a [`PointSampler`] currently owns
struct ActiveRun {
    cancel: CancelToken,
    finished: Arc<AtomicBool>,
}

impl ActiveRun {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && !self.finished.load(Ordering::SeqCst)
    }
}

/// Marks a run finished when its task ends, whichever way it ends
struct FinishGuard(Arc<AtomicBool>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Owner of the sampling task for one measurement run
///
/// Only one run is in flight at a time; starting a new one cancels the
/// previous run.
pub struct PointSampler<S: SensingSource + ?Sized + 'static> {
    source: Arc<S>,
    config: SamplingConfig,
    active: Option<ActiveRun>,
}

impl<S: SensingSource + ?Sized + 'static> PointSampler<S> {
    pub fn new(source: Arc<S>, config: SamplingConfig) -> Self {
        Self {
            source,
            config,
            active: None,
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Spawn a sampling run on the current tokio runtime
    pub fn start_sampling(&mut self, request: SampleRequest) -> SamplingStream {
        self.cancel();

        let cancel = CancelToken::new();
        let finished = Arc::new(AtomicBool::new(false));
        self.active = Some(ActiveRun {
            cancel: cancel.clone(),
            finished: Arc::clone(&finished),
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let run = SamplingRun::new(Arc::clone(&self.source), self.config.clone(), request);
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            let _finished = FinishGuard(finished);
            let progress_tx = tx.clone();
            let outcome = run
                .run(&task_cancel, move |p| {
                    let _ = progress_tx.send(SamplingEvent::Progress(p));
                })
                .await;

            // A run cancelled after its last tick still delivers nothing
            if task_cancel.is_cancelled() {
                return;
            }
            let event = match outcome {
                Some(Ok(point)) => SamplingEvent::Complete(point),
                Some(Err(err)) => SamplingEvent::Failed(err),
                None => return,
            };
            let _ = tx.send(event);
        });

        SamplingStream { events: rx, cancel }
    }

    /// Cancel the in-flight run, if any
    pub fn cancel(&mut self) {
        if let Some(run) = self.active.take() {
            run.cancel.cancel();
        }
    }

    /// Whether a run is still going: started, not cancelled (dropping its
    /// stream counts), and its task not yet finished
    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(ActiveRun::is_live)
    }
}
