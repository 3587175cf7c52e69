use super::monitor::{FrameRateMonitor, StageTimings};
use crate::capture::CaptureSource;
use crate::config::PipelineConfig;
use crate::effects::{composite, BlurStrategy};
use crate::error::PipelineError;
use crate::frame::Frame;
use crate::output::OutputSink;
use crate::segmentation::{ModelLoader, PendingMask, SegmentationResult, Segmenter};
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Render loop phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Raw frames pass straight through; waiting for blur mode and a ready model.
    Idle,
    /// Next tick synchronizes the canvas to the video dimensions.
    Priming,
    /// Draw, request, composite on arrival, repeat.
    Steady,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A raw frame was drawn and nothing was requested.
    Passthrough,
    /// A raw frame was drawn and sent for segmentation.
    Requested,
    /// The in-flight request has not resolved yet.
    Waiting,
    /// A result arrived and the composite was drawn.
    Composited { fps: u32 },
    /// A result arrived but was discarded; the previous output stays.
    Dropped,
}

struct InFlight {
    pending: PendingMask,
    frame: Arc<Frame>,
    issued_at: Instant,
}

/// Produces a fresh loader each time blur mode is entered.
pub type LoaderFactory<'a> = &'a dyn Fn() -> ModelLoader;

/// Drives capture, segmentation and compositing.
///
/// At most one segmentation request is in flight. A new one is only issued
/// after the previous result has been handled, so the composite rate follows
/// segmentation latency rather than the capture rate.
///
/// Every write to the output reaches viewers. Once a composite has been shown,
/// raw frames are only written again while the pending request is stalled.
pub struct RenderLoop<C, O> {
    capture: C,
    output: O,
    segmenter: Segmenter,
    blur: BlurStrategy,
    config: PipelineConfig,
    monitor: FrameRateMonitor,
    timings: StageTimings,
    phase: LoopPhase,
    blur_requested: bool,
    canvas: Option<(u32, u32)>,
    in_flight: Option<InFlight>,
    showing_composite: bool,
    epoch: Instant,
}

impl<C, O> RenderLoop<C, O>
where
    C: CaptureSource,
    O: OutputSink,
{
    pub fn new(capture: C, output: O, blur: BlurStrategy, config: PipelineConfig) -> Self {
        Self {
            capture,
            output,
            segmenter: Segmenter::new(),
            blur,
            config,
            monitor: FrameRateMonitor::new(0),
            timings: StageTimings::default(),
            phase: LoopPhase::Idle,
            blur_requested: false,
            canvas: None,
            in_flight: None,
            showing_composite: false,
            epoch: Instant::now(),
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn fps(&self) -> u32 {
        self.monitor.fps()
    }

    pub fn is_blurring(&self) -> bool {
        self.blur_requested
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Start loading the model; the loop primes once it reports ready.
    pub fn enter_blur_mode(&mut self, loader: ModelLoader) -> Result<(), PipelineError> {
        self.exit_blur_mode();
        self.segmenter.initialize(loader)?;

        self.blur_requested = true;
        self.canvas = None;
        let now = self.now_ms();
        self.monitor.reset(now);
        tracing::info!("Entering blur mode");
        Ok(())
    }

    /// Return to passthrough, cancelling any request still in flight.
    pub fn exit_blur_mode(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            tracing::debug!("Cancelling segmentation request {}", in_flight.pending.sequence());
            in_flight.pending.cancel();
        }
        if self.blur_requested {
            tracing::info!("Leaving blur mode");
        }
        self.segmenter.teardown();
        self.blur_requested = false;
        self.showing_composite = false;
        self.phase = LoopPhase::Idle;
    }

    /// Enter blur mode when passing through, leave it when blurring.
    pub fn toggle_blur_mode(&mut self, loaders: LoaderFactory<'_>) -> Result<(), PipelineError> {
        if self.blur_requested {
            self.exit_blur_mode();
            Ok(())
        } else {
            self.enter_blur_mode(loaders())
        }
    }

    /// Run a single iteration of the loop.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        match self.phase {
            LoopPhase::Idle => self.tick_idle(),
            LoopPhase::Priming => self.tick_priming(),
            LoopPhase::Steady => self.tick_steady(),
        }
    }

    /// Tick until `shutdown` is set, pacing to the target frame rate.
    ///
    /// Each time `toggle` is raised blur mode flips, using `loaders` to
    /// load a new model. A draw, request and composite cycle is paced once.
    pub fn run(
        &mut self,
        shutdown: &AtomicBool,
        toggle: &AtomicBool,
        loaders: Option<LoaderFactory<'_>>,
    ) -> Result<()> {
        let frame_duration = self.config.frame_interval();
        tracing::info!("Starting render loop");

        let mut cycle_start = Instant::now();
        while !shutdown.load(Ordering::Relaxed) {
            if toggle.swap(false, Ordering::Relaxed) {
                match loaders {
                    Some(loaders) => {
                        if let Err(err) = self.toggle_blur_mode(loaders) {
                            tracing::error!("Failed to toggle blur: {}", err);
                        }
                    }
                    None => tracing::warn!("No model configured, blur cannot be enabled"),
                }
            }

            let outcome = match self.tick() {
                Ok(outcome) => outcome,
                Err(err) => match err.downcast_ref::<PipelineError>() {
                    Some(PipelineError::CollaboratorInitFailure(reason)) => {
                        tracing::error!("Blur unavailable: {}", reason);
                        continue;
                    }
                    _ => return Err(err),
                },
            };

            // The cycle continues into the wait for its result
            if matches!(outcome, TickOutcome::Requested | TickOutcome::Waiting) {
                continue;
            }

            let elapsed = cycle_start.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            }
            cycle_start = Instant::now();
        }

        tracing::info!("Render loop stopped after {} composited frames", self.timings.frames());
        self.exit_blur_mode();
        Ok(())
    }

    fn tick_idle(&mut self) -> Result<TickOutcome> {
        let frame = self.capture_frame()?;
        self.draw(&frame)?;

        if self.blur_requested {
            match self.segmenter.poll_ready() {
                Ok(true) => {
                    tracing::debug!("Segmenter ready, priming render loop");
                    self.phase = LoopPhase::Priming;
                }
                Ok(false) => {}
                Err(err) => {
                    self.exit_blur_mode();
                    return Err(err.into());
                }
            }
        }

        Ok(TickOutcome::Passthrough)
    }

    fn tick_priming(&mut self) -> Result<TickOutcome> {
        let frame = self.capture_frame()?;
        let (width, height) = frame.dimensions();
        tracing::info!("Canvas synchronized to {}x{}", width, height);

        self.canvas = Some((width, height));
        self.phase = LoopPhase::Steady;
        self.request(frame)
    }

    fn tick_steady(&mut self) -> Result<TickOutcome> {
        if let Some(in_flight) = self.in_flight.take() {
            return self.await_in_flight(in_flight);
        }

        let frame = self.capture_frame()?;
        self.sync_canvas(&frame);
        self.request(frame)
    }

    /// Video dimensions can change at any time.
    fn sync_canvas(&mut self, frame: &Frame) {
        let dims = frame.dimensions();
        if self.canvas != Some(dims) {
            tracing::warn!("Video dimensions changed to {}x{}, resynchronizing", dims.0, dims.1);
            self.canvas = Some(dims);
        }
    }

    /// Hand `frame` to the segmenter. It is shown raw only while no composite
    /// is on screen.
    fn request(&mut self, frame: Frame) -> Result<TickOutcome> {
        if !self.showing_composite {
            self.draw(&frame)?;
        }

        let frame = Arc::new(frame);
        let timestamp_ms = self.now_ms();
        match self.segmenter.request(Arc::clone(&frame), timestamp_ms) {
            Ok(pending) => {
                self.in_flight = Some(InFlight {
                    pending,
                    frame,
                    issued_at: Instant::now(),
                });
                Ok(TickOutcome::Requested)
            }
            Err(err) => {
                // Raw frames only until the model becomes ready again
                tracing::debug!("Skipping segmentation: {}", err);
                if self.showing_composite {
                    self.draw(&frame)?;
                    self.showing_composite = false;
                }
                self.phase = LoopPhase::Idle;
                Ok(TickOutcome::Passthrough)
            }
        }
    }

    fn await_in_flight(&mut self, in_flight: InFlight) -> Result<TickOutcome> {
        if let Some(reply) = in_flight.pending.wait_timeout(self.config.frame_interval()) {
            return self.on_result(in_flight, reply);
        }

        let pending = &in_flight.pending;
        let timeout = self.config.segmentation_timeout;
        if !pending.is_cancelled() && in_flight.issued_at.elapsed() >= timeout {
            tracing::warn!(
                "Segmentation request {} exceeded {:?}, cancelling",
                pending.sequence(),
                timeout
            );
            pending.cancel();
        }

        let stalled = pending.is_cancelled();
        self.in_flight = Some(in_flight);

        if stalled {
            let frame = self.capture_frame()?;
            self.sync_canvas(&frame);
            self.draw(&frame)?;
            self.showing_composite = false;
            Ok(TickOutcome::Passthrough)
        } else {
            Ok(TickOutcome::Waiting)
        }
    }

    fn on_result(
        &mut self,
        in_flight: InFlight,
        reply: Result<SegmentationResult, PipelineError>,
    ) -> Result<TickOutcome> {
        let InFlight {
            pending,
            frame,
            issued_at,
        } = in_flight;

        if pending.is_cancelled() {
            tracing::debug!("Discarding result of cancelled request {}", pending.sequence());
            return Ok(TickOutcome::Dropped);
        }

        let segment_time = issued_at.elapsed();
        let now = self.now_ms();
        let fps = self.monitor.on_frame_arrival(now);

        let result = match reply {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!("Dropping frame: {}", err);
                return Ok(TickOutcome::Dropped);
            }
        };

        tracing::debug!(
            "Mask {} for t={}ms arrived after {:?}",
            result.sequence,
            result.timestamp_ms,
            segment_time
        );

        let started = Instant::now();
        let blurred = self.blur.blur(&frame);
        let blur_time = started.elapsed();

        let started = Instant::now();
        let output = if self.config.show_mask {
            result.mask.to_frame()
        } else {
            let sharp = Arc::try_unwrap(frame).unwrap_or_else(|shared| (*shared).clone());
            match composite(
                sharp,
                &blurred,
                &result.mask,
                self.config.min_confidence,
                self.config.foreground_source,
            ) {
                Ok(output) => output,
                Err(err) => {
                    tracing::warn!("Dropping frame {}: {}", result.sequence, err);
                    return Ok(TickOutcome::Dropped);
                }
            }
        };
        let composite_time = started.elapsed();

        self.draw(&output)?;
        self.showing_composite = true;
        self.timings.record(segment_time, blur_time, composite_time, fps);

        Ok(TickOutcome::Composited { fps })
    }

    fn capture_frame(&mut self) -> Result<Frame> {
        self.capture.capture_frame().context("Failed to capture frame")
    }

    fn draw(&mut self, frame: &Frame) -> Result<()> {
        self.output.write_frame(frame).context("Failed to write frame")
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ConfidenceMask;
    use crate::segmentation::SegmentationModel;
    use image::Rgba;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc::{self, Receiver};

    const SHARP: [u8; 4] = [200, 100, 50, 255];

    struct StaticCapture {
        width: u32,
        height: u32,
    }

    impl CaptureSource for StaticCapture {
        fn capture_frame(&mut self) -> Result<Frame> {
            Ok(Frame::from_fn(self.width, self.height, |x, _| {
                if x == 0 {
                    Rgba([0, 0, 0, 255])
                } else {
                    Rgba(SHARP)
                }
            }))
        }

        fn resolution(&self) -> (u32, u32) {
            (self.width, self.height)
        }
    }

    #[derive(Default)]
    struct Recorder {
        frames: Vec<Frame>,
    }

    impl OutputSink for Recorder {
        fn write_frame(&mut self, frame: &Frame) -> Result<()> {
            self.frames.push(frame.clone());
            Ok(())
        }

        fn resolution(&self) -> (u32, u32) {
            (0, 0)
        }
    }

    struct Uniform(f32);

    impl SegmentationModel for Uniform {
        fn segment(&mut self, frame: &Frame, _timestamp_ms: u64) -> Result<ConfidenceMask> {
            let (w, h) = frame.dimensions();
            Ok(ConfidenceMask::filled(w, h, self.0))
        }

        fn input_size(&self) -> (u32, u32) {
            (1, 1)
        }
    }

    /// Never answers until the sender side is dropped.
    struct Hanging(Receiver<()>);

    impl SegmentationModel for Hanging {
        fn segment(&mut self, _frame: &Frame, _timestamp_ms: u64) -> Result<ConfidenceMask> {
            let _ = self.0.recv();
            anyhow::bail!("released")
        }

        fn input_size(&self) -> (u32, u32) {
            (1, 1)
        }
    }

    fn loader<M: SegmentationModel + 'static>(model: M) -> ModelLoader {
        Box::new(move || -> Result<Box<dyn SegmentationModel>> { Ok(Box::new(model)) })
    }

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            target_fps: 200,
            segmentation_timeout: Duration::from_millis(30),
            ..PipelineConfig::default()
        }
    }

    fn render_loop(config: PipelineConfig) -> RenderLoop<StaticCapture, Recorder> {
        RenderLoop::new(
            StaticCapture { width: 4, height: 3 },
            Recorder::default(),
            BlurStrategy::Stack { radius: 2 },
            config,
        )
    }

    fn tick_until<C, O>(
        render_loop: &mut RenderLoop<C, O>,
        mut done: impl FnMut(TickOutcome) -> bool,
    ) -> Option<TickOutcome>
    where
        C: CaptureSource,
        O: OutputSink,
    {
        for _ in 0..2000 {
            let outcome = render_loop.tick().unwrap();
            if done(outcome) {
                return Some(outcome);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        None
    }

    #[test]
    fn passthrough_without_blur_mode() {
        let mut render_loop = render_loop(test_config());
        for _ in 0..3 {
            assert_eq!(render_loop.tick().unwrap(), TickOutcome::Passthrough);
        }
        assert_eq!(render_loop.phase(), LoopPhase::Idle);
        assert_eq!(render_loop.output().frames.len(), 3);
    }

    #[test]
    fn full_confidence_composite_matches_raw_frame() {
        let mut render_loop = render_loop(test_config());
        render_loop.enter_blur_mode(loader(Uniform(1.0))).unwrap();

        let outcome = tick_until(&mut render_loop, |o| matches!(o, TickOutcome::Composited { .. }));
        assert!(outcome.is_some());
        assert_eq!(render_loop.phase(), LoopPhase::Steady);

        let frames = &render_loop.output().frames;
        let raw = StaticCapture { width: 4, height: 3 }.capture_frame().unwrap();
        assert_eq!(frames.last().unwrap(), &raw);
    }

    #[test]
    fn zero_confidence_composite_is_blurred() {
        let mut render_loop = render_loop(test_config());
        render_loop.enter_blur_mode(loader(Uniform(0.0))).unwrap();

        tick_until(&mut render_loop, |o| matches!(o, TickOutcome::Composited { .. })).unwrap();

        let raw = StaticCapture { width: 4, height: 3 }.capture_frame().unwrap();
        let blurred = BlurStrategy::Stack { radius: 2 }.blur(&raw);
        let last = render_loop.output().frames.last().unwrap();
        for (out, (b, r)) in last.pixels().zip(blurred.pixels().zip(raw.pixels())) {
            assert_eq!(&out.0[..3], &b.0[..3]);
            assert_eq!(out[3], r[3]);
        }
    }

    #[test]
    fn requests_never_overlap() {
        let mut render_loop = render_loop(test_config());
        render_loop.enter_blur_mode(loader(Uniform(1.0))).unwrap();
        tick_until(&mut render_loop, |o| o == TickOutcome::Requested).unwrap();

        let mut last_was_request = true;
        let mut composites = 0;
        for _ in 0..2000 {
            match render_loop.tick().unwrap() {
                TickOutcome::Requested => {
                    assert!(!last_was_request, "second request issued while one was in flight");
                    last_was_request = true;
                }
                TickOutcome::Composited { .. } | TickOutcome::Dropped => {
                    last_was_request = false;
                    composites += 1;
                    if composites == 5 {
                        break;
                    }
                }
                _ => {}
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(composites, 5);
        assert_eq!(render_loop.phase(), LoopPhase::Steady);
    }

    #[test]
    fn raw_frames_stop_once_a_composite_is_shown() {
        let mut render_loop = render_loop(test_config());
        render_loop.enter_blur_mode(loader(Uniform(0.0))).unwrap();

        let mut composites = 0;
        tick_until(&mut render_loop, |o| {
            if matches!(o, TickOutcome::Composited { .. }) {
                composites += 1;
            }
            composites == 4
        })
        .unwrap();

        let raw = StaticCapture { width: 4, height: 3 }.capture_frame().unwrap();
        let frames = &render_loop.output().frames;
        let first_composite = frames.iter().position(|f| f != &raw).unwrap();
        assert!(frames[first_composite..].iter().all(|f| f != &raw));
        assert_eq!(frames.len() - first_composite, 4);
    }

    #[test]
    fn toggling_blur_mode_primes_again() {
        let mut render_loop = render_loop(test_config());
        let loaders = || loader(Uniform(0.0));

        render_loop.toggle_blur_mode(&loaders).unwrap();
        tick_until(&mut render_loop, |o| matches!(o, TickOutcome::Composited { .. })).unwrap();

        render_loop.toggle_blur_mode(&loaders).unwrap();
        assert!(!render_loop.is_blurring());
        assert_eq!(render_loop.tick().unwrap(), TickOutcome::Passthrough);

        let raw = StaticCapture { width: 4, height: 3 }.capture_frame().unwrap();
        assert_eq!(render_loop.output().frames.last().unwrap(), &raw);

        render_loop.toggle_blur_mode(&loaders).unwrap();
        assert!(render_loop.is_blurring());
        tick_until(&mut render_loop, |o| matches!(o, TickOutcome::Composited { .. })).unwrap();
        assert_eq!(render_loop.phase(), LoopPhase::Steady);
        assert_ne!(render_loop.output().frames.last().unwrap(), &raw);
    }

    /// Counts segment calls.
    struct Counting(Arc<AtomicUsize>);

    impl SegmentationModel for Counting {
        fn segment(&mut self, frame: &Frame, _timestamp_ms: u64) -> Result<ConfidenceMask> {
            self.0.fetch_add(1, Ordering::SeqCst);
            let (w, h) = frame.dimensions();
            Ok(ConfidenceMask::filled(w, h, 1.0))
        }

        fn input_size(&self) -> (u32, u32) {
            (1, 1)
        }
    }

    #[test]
    fn run_composites_near_target_rate_with_instant_model() {
        let config = PipelineConfig {
            target_fps: 50,
            ..test_config()
        };
        let mut render_loop = render_loop(config);
        let segments = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&segments);
        let make_loader = move || loader(Counting(Arc::clone(&counter)));
        let loaders: LoaderFactory<'_> = &make_loader;

        let shutdown = Arc::new(AtomicBool::new(false));
        let toggle = AtomicBool::new(true);
        let stopper = {
            let shutdown = Arc::clone(&shutdown);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(1000));
                shutdown.store(true, Ordering::Relaxed);
            })
        };

        render_loop.run(&shutdown, &toggle, Some(loaders)).unwrap();
        stopper.join().unwrap();

        // 50 cycles fit in a second; pacing every tick would halve that
        let count = segments.load(Ordering::SeqCst);
        assert!(count >= 35, "only {count} segmentations in one second");
        assert!(!render_loop.is_blurring());
    }

    #[test]
    fn unresolved_segmentation_keeps_raw_frames_flowing() {
        let (_release, gate) = mpsc::channel::<()>();
        let mut render_loop = render_loop(test_config());
        render_loop.enter_blur_mode(loader(Hanging(gate))).unwrap();

        tick_until(&mut render_loop, |o| o == TickOutcome::Requested).unwrap();
        let drawn = render_loop.output().frames.len();

        // After the timeout every tick falls back to drawing the raw frame
        let mut passthrough = 0;
        for _ in 0..200 {
            match render_loop.tick().unwrap() {
                TickOutcome::Passthrough => passthrough += 1,
                TickOutcome::Waiting => {}
                other => panic!("unexpected outcome {other:?}"),
            }
            if passthrough >= 5 {
                break;
            }
        }

        assert!(passthrough >= 5);
        assert_eq!(render_loop.phase(), LoopPhase::Steady);
        assert!(render_loop.output().frames.len() >= drawn + 5);
    }

    #[test]
    fn init_failure_is_surfaced_and_leaves_blur_mode() {
        let mut render_loop = render_loop(test_config());
        render_loop
            .enter_blur_mode(Box::new(|| -> Result<Box<dyn SegmentationModel>> {
                anyhow::bail!("no such model")
            }))
            .unwrap();

        let mut surfaced = None;
        for _ in 0..2000 {
            match render_loop.tick() {
                Ok(_) => std::thread::sleep(Duration::from_millis(1)),
                Err(err) => {
                    surfaced = Some(err);
                    break;
                }
            }
        }

        let err = surfaced.expect("init failure was not reported");
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::CollaboratorInitFailure(_))
        ));
        assert!(!render_loop.is_blurring());
        assert_eq!(render_loop.tick().unwrap(), TickOutcome::Passthrough);
    }

    #[test]
    fn exit_blur_mode_discards_in_flight_request() {
        let (_release, gate) = mpsc::channel::<()>();
        let mut render_loop = render_loop(test_config());
        render_loop.enter_blur_mode(loader(Hanging(gate))).unwrap();
        tick_until(&mut render_loop, |o| o == TickOutcome::Requested).unwrap();

        render_loop.exit_blur_mode();
        assert_eq!(render_loop.phase(), LoopPhase::Idle);
        assert!(!render_loop.is_blurring());
        assert_eq!(render_loop.tick().unwrap(), TickOutcome::Passthrough);
    }

    #[test]
    fn frame_rate_follows_result_arrivals() {
        let mut render_loop = render_loop(test_config());
        render_loop.enter_blur_mode(loader(Uniform(1.0))).unwrap();

        tick_until(&mut render_loop, |o| matches!(o, TickOutcome::Composited { .. })).unwrap();
        let outcome =
            tick_until(&mut render_loop, |o| matches!(o, TickOutcome::Composited { .. })).unwrap();

        match outcome {
            TickOutcome::Composited { fps } => {
                assert!(fps > 0);
                assert_eq!(fps, render_loop.fps());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    struct WrongSize;

    impl SegmentationModel for WrongSize {
        fn segment(&mut self, _frame: &Frame, _timestamp_ms: u64) -> Result<ConfidenceMask> {
            Ok(ConfidenceMask::filled(1, 1, 1.0))
        }

        fn input_size(&self) -> (u32, u32) {
            (1, 1)
        }
    }

    #[test]
    fn mismatched_mask_drops_frame_and_continues() {
        let mut render_loop = render_loop(test_config());
        render_loop.enter_blur_mode(loader(WrongSize)).unwrap();

        tick_until(&mut render_loop, |o| o == TickOutcome::Dropped).unwrap();
        let drawn = render_loop.output().frames.len();

        // The loop re-arms and keeps requesting after a dropped frame
        tick_until(&mut render_loop, |o| o == TickOutcome::Requested).unwrap();
        assert_eq!(render_loop.phase(), LoopPhase::Steady);
        assert_eq!(render_loop.output().frames.len(), drawn + 1);
    }

    #[test]
    fn show_mask_outputs_mask_image() {
        let config = PipelineConfig {
            show_mask: true,
            ..test_config()
        };
        let mut render_loop = render_loop(config);
        render_loop.enter_blur_mode(loader(Uniform(1.0))).unwrap();

        tick_until(&mut render_loop, |o| matches!(o, TickOutcome::Composited { .. })).unwrap();
        let last = render_loop.output().frames.last().unwrap();
        assert!(last.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }
}
