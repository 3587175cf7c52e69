use std::time::Duration;

/// Composited frames between two stats lines.
const STATS_INTERVAL: u64 = 30;

/// Instantaneous frame rate from consecutive result arrivals.
#[derive(Debug, Default)]
pub struct FrameRateMonitor {
    last_arrival_ms: u64,
    fps: u32,
}

impl FrameRateMonitor {
    pub fn new(now_ms: u64) -> Self {
        Self {
            last_arrival_ms: now_ms,
            fps: 0,
        }
    }

    pub fn reset(&mut self, now_ms: u64) {
        self.last_arrival_ms = now_ms;
        self.fps = 0;
    }

    /// Record an arrival and return the rounded rate since the previous one.
    ///
    /// A zero (or backwards) delta counts as 1 ms, capping the result at 1000.
    pub fn on_frame_arrival(&mut self, now_ms: u64) -> u32 {
        let delta = now_ms.saturating_sub(self.last_arrival_ms).max(1);
        self.last_arrival_ms = now_ms;
        self.fps = (1000.0 / delta as f64).round() as u32;
        self.fps
    }

    /// Last computed rate, for display.
    pub fn fps(&self) -> u32 {
        self.fps
    }
}

/// Running per-stage totals, reported every few composited frames.
#[derive(Debug, Default)]
pub struct StageTimings {
    frames: u64,
    total_segment: Duration,
    total_blur: Duration,
    total_composite: Duration,
}

impl StageTimings {
    pub fn record(&mut self, segment: Duration, blur: Duration, composite: Duration, fps: u32) {
        self.frames += 1;
        self.total_segment += segment;
        self.total_blur += blur;
        self.total_composite += composite;

        if self.frames % STATS_INTERVAL == 0 {
            let n = self.frames as f64;
            tracing::info!(
                "Frame {}: segment={:.1}ms, blur={:.1}ms, composite={:.1}ms, fps={}",
                self.frames,
                self.total_segment.as_secs_f64() * 1000.0 / n,
                self.total_blur.as_secs_f64() * 1000.0 / n,
                self.total_composite.as_secs_f64() * 1000.0 / n,
                fps
            );
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}
