// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the point sampler
//!
//! All tests run on a paused tokio clock, so a full sampling window takes no
//! wall time and each tick sees exactly one scripted frame.

use futures::StreamExt;
use glam::DVec3;
use std::sync::Arc;
use will_it_fit::config::SamplingConfig;
use will_it_fit::errors::{SamplingError, SurfaceKind};
use will_it_fit::measurement::{Alignment, HitQuality};
use will_it_fit::sensing::{
    Hit, HitCandidate, PlaneOrientation, PointSampler, SampleRequest, SamplingEvent,
    ScreenPoint, ScriptedFrame, ScriptedSource, SensingSource, TapScript, Trackable,
    TrackingQuality,
};

fn floor_plane(x: f64) -> HitCandidate {
    HitCandidate::new(
        DVec3::new(x, 0.0, -1.0),
        Trackable::Plane {
            orientation: PlaneOrientation::HorizontalUpward,
            in_polygon: true,
        },
    )
}

fn depth_point(x: f64) -> HitCandidate {
    HitCandidate::new(DVec3::new(x, 1.0, -1.0), Trackable::DepthPoint)
}

fn lenient() -> SampleRequest {
    SampleRequest {
        anchor: ScreenPoint::new(100.0, 200.0),
        alignment: Alignment::Any,
        require_plane: false,
    }
}

fn strict_floor() -> SampleRequest {
    SampleRequest {
        anchor: ScreenPoint::new(100.0, 200.0),
        alignment: Alignment::Horizontal,
        require_plane: true,
    }
}

fn sampler(script: TapScript) -> PointSampler<ScriptedSource> {
    PointSampler::new(
        Arc::new(ScriptedSource::new(script)),
        SamplingConfig::default(),
    )
}

/// Drain a stream, splitting progress values from the terminal event
async fn collect(
    mut stream: will_it_fit::sensing::SamplingStream,
) -> (Vec<f64>, Option<SamplingEvent>) {
    let mut progress = Vec::new();
    let mut terminal = None;
    while let Some(event) = stream.next().await {
        match event {
            SamplingEvent::Progress(p) => progress.push(p),
            other => {
                assert!(terminal.is_none(), "More than one terminal event");
                terminal = Some(other);
            }
        }
    }
    (progress, terminal)
}

#[tokio::test(start_paused = true)]
async fn test_steady_hit_completes() {
    let mut sampler = sampler(TapScript::steady(depth_point(0.5)));
    let (progress, terminal) = collect(sampler.start_sampling(lenient())).await;

    let Some(SamplingEvent::Complete(point)) = terminal else {
        panic!("expected a point, got {:?}", terminal);
    };
    assert_eq!(point.position, DVec3::new(0.5, 1.0, -1.0));
    assert_eq!(point.quality, HitQuality::DepthPoint);
    assert_eq!(point.spread_cm, 0.0);
    assert_eq!(point.tracking_confidence, 1.0);
    assert!(point.sample_count >= 40, "got {} samples", point.sample_count);
    assert_eq!(progress.len(), point.sample_count);
}

#[tokio::test(start_paused = true)]
async fn test_progress_is_bounded_and_monotonic() {
    let mut sampler = sampler(TapScript::steady(depth_point(0.0)));
    let (progress, terminal) = collect(sampler.start_sampling(lenient())).await;

    assert!(matches!(terminal, Some(SamplingEvent::Complete(_))));
    assert!(!progress.is_empty());
    assert!(progress.iter().all(|p| (0.0..=1.0).contains(p)));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test(start_paused = true)]
async fn test_tracking_lost_before_window_ends() {
    let script = TapScript {
        anchor: ScreenPoint::default(),
        frames: vec![ScriptedFrame::empty(TrackingQuality::Stopped)],
    };
    let mut sampler = sampler(script);

    let started = tokio::time::Instant::now();
    let (progress, terminal) = collect(sampler.start_sampling(lenient())).await;

    assert_eq!(terminal, Some(SamplingEvent::Failed(SamplingError::TrackingLost)));
    // Ten tolerated ticks, the eleventh aborts
    assert_eq!(progress.len(), 10);
    assert!(started.elapsed() < SamplingConfig::default().window());
}

#[tokio::test(start_paused = true)]
async fn test_brief_tracking_dropout_is_tolerated() {
    let mut frames = vec![ScriptedFrame::empty(TrackingQuality::Degraded); 8];
    frames.push(ScriptedFrame::hit(depth_point(0.2)));
    let mut sampler = sampler(TapScript {
        anchor: ScreenPoint::default(),
        frames,
    });

    let (_, terminal) = collect(sampler.start_sampling(lenient())).await;
    let Some(SamplingEvent::Complete(point)) = terminal else {
        panic!("expected a point, got {:?}", terminal);
    };
    assert!(point.sample_count < 47);
    assert_eq!(point.tracking_confidence, 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_strict_without_plane_fails_immediately() {
    let mut sampler = sampler(TapScript::steady(depth_point(0.0)));

    let started = tokio::time::Instant::now();
    let (progress, terminal) = collect(sampler.start_sampling(strict_floor())).await;

    assert_eq!(
        terminal,
        Some(SamplingEvent::Failed(SamplingError::NoPlaneDetected {
            surface: SurfaceKind::Floor
        }))
    );
    assert!(progress.is_empty());
    assert_eq!(started.elapsed(), std::time::Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_too_few_samples() {
    let mut frames = vec![ScriptedFrame::hit(depth_point(0.0)); 5];
    frames.push(ScriptedFrame::empty(TrackingQuality::Good));
    let mut sampler = sampler(TapScript {
        anchor: ScreenPoint::default(),
        frames,
    });

    let (_, terminal) = collect(sampler.start_sampling(lenient())).await;
    assert_eq!(
        terminal,
        Some(SamplingEvent::Failed(SamplingError::NotEnoughSamples {
            collected: 5,
            required: 10
        }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_plane_disappearing_after_upfront_check() {
    // A plane at tick zero passes the upfront check but isn't enough by itself
    let mut frames = vec![ScriptedFrame::hit(floor_plane(0.0)); 5];
    frames.push(ScriptedFrame::hit(depth_point(0.0)));
    let mut sampler = sampler(TapScript {
        anchor: ScreenPoint::default(),
        frames,
    });

    let (_, terminal) = collect(sampler.start_sampling(strict_floor())).await;
    assert_eq!(
        terminal,
        Some(SamplingEvent::Failed(SamplingError::PlaneNotReliable {
            surface: SurfaceKind::Floor
        }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_jitter_beyond_ceiling_is_unstable() {
    let script = TapScript::jittered(floor_plane(0.0), 0.02, 8);
    let mut sampler = sampler(script);

    let (_, terminal) = collect(sampler.start_sampling(strict_floor())).await;
    assert!(
        matches!(
            terminal,
            Some(SamplingEvent::Failed(SamplingError::PositionUnstable { spread_cm })) if spread_cm > 1.5
        ),
        "got {:?}",
        terminal
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_delivers_no_terminal_event() {
    let mut sampler = sampler(TapScript::steady(floor_plane(0.0)));
    let mut stream = sampler.start_sampling(strict_floor());

    for _ in 0..3 {
        assert!(matches!(stream.next().await, Some(SamplingEvent::Progress(_))));
    }
    stream.cancel();

    let (_, terminal) = collect(stream).await;
    assert_eq!(terminal, None);
}

#[tokio::test(start_paused = true)]
async fn test_new_run_cancels_previous() {
    let mut sampler = sampler(TapScript::steady(floor_plane(0.0)));

    let first = sampler.start_sampling(strict_floor());
    let second = sampler.start_sampling(strict_floor());

    assert_eq!(first.finish(|_| {}).await, None);
    let point = second.finish(|_| {}).await;
    assert!(matches!(point, Some(Ok(p)) if p.quality == HitQuality::ExistingPlane));
}

/// Tracker whose priority hit test only ever finds an estimated surface,
/// even when asked for plane geometry
struct EstimatedOnly;

impl SensingSource for EstimatedOnly {
    fn tracking_quality(&self) -> TrackingQuality {
        TrackingQuality::Good
    }

    fn hit_test(&self, _anchor: ScreenPoint) -> Vec<HitCandidate> {
        vec![floor_plane(0.0)]
    }

    fn priority_hit_test(
        &self,
        _anchor: ScreenPoint,
        _alignment: Alignment,
        _strict: bool,
    ) -> Option<Hit> {
        Some(Hit {
            position: DVec3::new(0.25, 0.0, -1.0),
            quality: HitQuality::EstimatedSurface,
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_strict_run_ignores_estimated_hits() {
    let mut sampler = PointSampler::new(Arc::new(EstimatedOnly), SamplingConfig::default());

    let outcome = sampler.start_sampling(strict_floor()).finish(|_| {}).await;
    assert_eq!(
        outcome,
        Some(Err(SamplingError::PlaneNotReliable {
            surface: SurfaceKind::Floor
        }))
    );

    let outcome = sampler.start_sampling(lenient()).finish(|_| {}).await;
    assert!(
        matches!(outcome, Some(Ok(ref p)) if p.quality == HitQuality::EstimatedSurface),
        "got {:?}",
        outcome
    );
}

#[tokio::test(start_paused = true)]
async fn test_is_active_follows_run_lifetime() {
    let mut sampler = sampler(TapScript::steady(floor_plane(0.0)));
    assert!(!sampler.is_active());

    let stream = sampler.start_sampling(strict_floor());
    assert!(sampler.is_active());
    drop(stream);
    assert!(!sampler.is_active());

    let outcome = sampler.start_sampling(strict_floor()).finish(|_| {}).await;
    assert!(matches!(outcome, Some(Ok(_))));
    assert!(!sampler.is_active());
}
