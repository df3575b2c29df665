//! Control loop
//!
//! One iteration: acquire a frame, classify it, push the sample into the
//! confirmation window, dispatch the verdict through the handshake
//! coordinator and render the overlay. The loop runs until the frame
//! source fails, the stop signal is raised or the overlay reports the exit
//! key. Whatever ends it, the frame source, the overlay and the link are
//! released exactly once.

use crate::coordinator::{HandshakeCoordinator, SendOutcome};
use crate::transport::CommandSink;
use serde::Serialize;
use sortline_core::{
    ClassificationSample, ConfirmationWindow, Detection, FrameAnnotation, FrameSource,
    InferenceError, InferencePort, Overlay, OverlayAction, Verdict,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// External request to stop the loop, checked once per iteration
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Raw flag, for registration with OS signal handlers
    pub fn handle(&self) -> Arc<AtomicBool> {
        self.requested.clone()
    }
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// The frame source could not deliver another frame
    FrameSourceExhausted,
    /// The stop signal was raised
    StopRequested,
    /// The operator pressed the exit key
    ExitKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stop(StopReason),
}

/// Counters kept across iterations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopStats {
    pub frames: u64,
    pub inference_failures: u64,
    pub confirmations: u64,
    pub no_match: u64,
    pub sent: u64,
    pub dropped: u64,
    pub write_failures: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopReport {
    pub reason: StopReason,
    pub stats: LoopStats,
}

pub struct ControlLoop<Src, Inf, Ov, S>
where
    Src: FrameSource,
    Inf: InferencePort<Src::Frame>,
    Ov: Overlay<Src::Frame>,
    S: CommandSink,
{
    source: Src,
    model: Inf,
    overlay: Ov,
    window: ConfirmationWindow,
    coordinator: HandshakeCoordinator<S>,
    stop: StopSignal,
    num_classes: u8,
    stats: LoopStats,
    last: Option<FrameAnnotation>,
    released: bool,
}

impl<Src, Inf, Ov, S> ControlLoop<Src, Inf, Ov, S>
where
    Src: FrameSource,
    Inf: InferencePort<Src::Frame>,
    Ov: Overlay<Src::Frame>,
    S: CommandSink,
{
    pub fn new(
        source: Src,
        model: Inf,
        overlay: Ov,
        window: ConfirmationWindow,
        coordinator: HandshakeCoordinator<S>,
        stop: StopSignal,
    ) -> Self {
        Self {
            source,
            model,
            overlay,
            window,
            coordinator,
            stop,
            num_classes: u8::MAX,
            stats: LoopStats::default(),
            last: None,
            released: false,
        }
    }

    /// Treat detections with `class_id >= num_classes` as inference failures
    pub fn with_num_classes(mut self, num_classes: u8) -> Self {
        self.num_classes = num_classes;
        self
    }

    /// Run until a stop condition, then release every resource
    pub fn run(mut self) -> LoopReport {
        info!("Control loop started");
        let reason = loop {
            if self.stop.is_requested() {
                break StopReason::StopRequested;
            }
            if let TickOutcome::Stop(reason) = self.tick() {
                break reason;
            }
        };

        self.shutdown();
        info!(
            "Control loop stopped ({:?}): {} frames, {} confirmations, {} sent, {} dropped",
            reason, self.stats.frames, self.stats.confirmations, self.stats.sent, self.stats.dropped
        );
        LoopReport {
            reason,
            stats: self.stats.clone(),
        }
    }

    /// Run a single iteration
    pub fn tick(&mut self) -> TickOutcome {
        let mut frame = match self.source.acquire() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("{}; stopping", e);
                return TickOutcome::Stop(StopReason::FrameSourceExhausted);
            }
        };
        self.stats.frames += 1;

        let started = Instant::now();
        match self.classify(&frame, started) {
            Ok((detection, sample)) => {
                let verdict = self.window.push(sample);
                self.decide(&verdict);
                self.last = Some(FrameAnnotation { detection, verdict });
            }
            Err(e) => {
                self.stats.inference_failures += 1;
                warn!("{}; skipping frame", e);
            }
        }

        match self.overlay.render(&mut frame, self.last.as_ref()) {
            OverlayAction::Continue => TickOutcome::Continue,
            OverlayAction::Exit => TickOutcome::Stop(StopReason::ExitKey),
        }
    }

    fn classify(
        &mut self,
        frame: &Src::Frame,
        started: Instant,
    ) -> Result<(Detection, ClassificationSample), InferenceError> {
        let detection = self.model.classify(frame)?;
        let latency = started.elapsed();

        if detection.class_id.0 >= self.num_classes {
            return Err(InferenceError(format!(
                "class {} outside label set of {}",
                detection.class_id, self.num_classes
            )));
        }

        let sample = ClassificationSample::from_detection(&detection, latency)?;
        Ok((detection, sample))
    }

    fn decide(&mut self, verdict: &Verdict) {
        match verdict {
            Verdict::Unconfirmed => {}
            Verdict::NoMatch { leader, count } => {
                self.stats.no_match += 1;
                debug!("No class confirmed (best: class {}, {} votes)", leader, count);
            }
            Verdict::Confirmed(confirmation) => {
                self.stats.confirmations += 1;
                debug!("{}", confirmation);
            }
        }

        match self.coordinator.dispatch(verdict) {
            SendOutcome::Sent => self.stats.sent += 1,
            SendOutcome::Dropped => self.stats.dropped += 1,
            SendOutcome::NotConfirmed => {}
        }
        self.stats.write_failures = self.coordinator.write_failures();
    }

    /// Release the frame source, overlay and link. Idempotent.
    fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        self.source.release();
        self.overlay.close();
        self.coordinator.close();
        debug!("Control loop resources released");
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn window(&self) -> &ConfirmationWindow {
        &self.window
    }

    pub fn coordinator(&self) -> &HandshakeCoordinator<S> {
        &self.coordinator
    }

    /// Annotation of the most recent successful tick
    pub fn last_annotation(&self) -> Option<&FrameAnnotation> {
        self.last.as_ref()
    }
}

impl<Src, Inf, Ov, S> Drop for ControlLoop<Src, Inf, Ov, S>
where
    Src: FrameSource,
    Inf: InferencePort<Src::Frame>,
    Ov: Overlay<Src::Frame>,
    S: CommandSink,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolConfig;
    use crate::readiness::ReadinessFlag;
    use crate::transport::DryRunSink;
    use sortline_core::{BoundingBox, ClassId, FrameAcquisitionError};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    struct ScriptedFrames {
        remaining: usize,
        released: Arc<AtomicUsize>,
    }

    impl FrameSource for ScriptedFrames {
        type Frame = ();

        fn acquire(&mut self) -> Result<(), FrameAcquisitionError> {
            if self.remaining == 0 {
                return Err(FrameAcquisitionError("no more frames".to_string()));
            }
            self.remaining -= 1;
            Ok(())
        }

        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ScriptedModel(VecDeque<Result<u8, &'static str>>);

    impl InferencePort<()> for ScriptedModel {
        fn classify(&mut self, _frame: &()) -> Result<Detection, InferenceError> {
            match self.0.pop_front() {
                Some(Ok(class)) => Ok(Detection::new(ClassId(class), 0.9, BoundingBox::default())),
                Some(Err(msg)) => Err(InferenceError(msg.to_string())),
                None => Err(InferenceError("script exhausted".to_string())),
            }
        }
    }

    #[derive(Default)]
    struct CountingOverlay {
        rendered: Vec<Option<FrameAnnotation>>,
    }

    impl Overlay<()> for CountingOverlay {
        fn render(&mut self, _frame: &mut (), annotation: Option<&FrameAnnotation>) -> OverlayAction {
            self.rendered.push(annotation.copied());
            OverlayAction::Continue
        }
    }

    fn control_loop(
        frames: usize,
        script: Vec<Result<u8, &'static str>>,
    ) -> ControlLoop<ScriptedFrames, ScriptedModel, CountingOverlay, DryRunSink> {
        let coordinator =
            HandshakeCoordinator::new(ReadinessFlag::new(), DryRunSink::new(), ProtocolConfig::default());
        ControlLoop::new(
            ScriptedFrames {
                remaining: frames,
                released: Arc::new(AtomicUsize::new(0)),
            },
            ScriptedModel(script.into()),
            CountingOverlay::default(),
            ConfirmationWindow::with_policy(5, 4).unwrap(),
            coordinator,
            StopSignal::new(),
        )
        .with_num_classes(3)
    }

    #[test]
    fn test_inference_failure_keeps_previous_annotation() {
        let mut ctl = control_loop(3, vec![Ok(1), Err("bad frame"), Ok(2)]);

        assert_eq!(ctl.tick(), TickOutcome::Continue);
        assert_eq!(ctl.tick(), TickOutcome::Continue);
        assert_eq!(ctl.window().len(), 1);
        assert_eq!(ctl.stats().inference_failures, 1);

        let rendered = &ctl.overlay.rendered;
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0], rendered[1]);
        assert_eq!(rendered[1].unwrap().detection.class_id, ClassId(1));
    }

    #[test]
    fn test_out_of_range_class_is_skipped() {
        let mut ctl = control_loop(1, vec![Ok(7)]);
        assert_eq!(ctl.tick(), TickOutcome::Continue);
        assert!(ctl.window().is_empty());
        assert_eq!(ctl.stats().inference_failures, 1);
        assert!(ctl.overlay.rendered[0].is_none());
    }

    #[test]
    fn test_acquisition_failure_stops() {
        let mut ctl = control_loop(0, vec![]);
        assert_eq!(ctl.tick(), TickOutcome::Stop(StopReason::FrameSourceExhausted));
        assert!(ctl.overlay.rendered.is_empty());
    }

    #[test]
    fn test_run_releases_resources_once() {
        let ctl = control_loop(2, vec![Ok(0), Ok(0)]);
        let released = Arc::clone(&ctl.source.released);
        let report = ctl.run();
        assert_eq!(report.reason, StopReason::FrameSourceExhausted);
        assert_eq!(report.stats.frames, 2);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_signal_checked_before_each_tick() {
        let ctl = control_loop(100, vec![Ok(0); 100]);
        ctl.stop.request();
        let report = ctl.run();
        assert_eq!(report.reason, StopReason::StopRequested);
        assert_eq!(report.stats.frames, 0);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut ctl = control_loop(1, vec![Ok(0)]);
        ctl.shutdown();
        assert_eq!(ctl.source.released.load(Ordering::SeqCst), 1);
        ctl.shutdown();
        assert_eq!(ctl.source.released.load(Ordering::SeqCst), 1);
        assert!(!ctl.coordinator().sink().is_open());
    }
}
