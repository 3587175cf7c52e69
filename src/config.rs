use anyhow::{ensure, Result};
use clap::ValueEnum;
use std::time::Duration;

pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.4;
pub const DEFAULT_BLUR_RADIUS: f32 = 10.0;
pub const DEFAULT_BLUR_ITERATIONS: u32 = 3;
pub const DEFAULT_FALLBACK_BLUR_RADIUS: u32 = 20;
pub const DEFAULT_TARGET_FPS: u32 = 30;
pub const DEFAULT_SEGMENTATION_TIMEOUT_MS: u64 = 1000;

/// Which frame supplies the pixels classified as foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ForegroundSource {
    /// Subject stays sharp, background is blurred.
    Sharp,
    /// Subject is blurred, background stays sharp.
    Blurred,
}

/// Requested blur implementation; `Auto` defers to capability negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BlurStrategyChoice {
    Auto,
    Filter,
    Stack,
}

/// Tunables for the compositing pipeline, fixed for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Confidence at or above which a pixel counts as foreground
    pub min_confidence: f32,
    /// Gaussian sigma used by the filter strategy
    pub blur_radius: f32,
    /// Number of filter passes
    pub blur_iterations: u32,
    /// Kernel radius used by the stack blur strategy
    pub fallback_blur_radius: u32,
    pub foreground_source: ForegroundSource,
    pub blur_strategy: BlurStrategyChoice,
    pub target_fps: u32,
    /// Age after which an unanswered segmentation request is cancelled
    pub segmentation_timeout: Duration,
    /// Emit the confidence mask instead of the composite
    pub show_mask: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            blur_radius: DEFAULT_BLUR_RADIUS,
            blur_iterations: DEFAULT_BLUR_ITERATIONS,
            fallback_blur_radius: DEFAULT_FALLBACK_BLUR_RADIUS,
            foreground_source: ForegroundSource::Sharp,
            blur_strategy: BlurStrategyChoice::Auto,
            target_fps: DEFAULT_TARGET_FPS,
            segmentation_timeout: Duration::from_millis(DEFAULT_SEGMENTATION_TIMEOUT_MS),
            show_mask: false,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.target_fps > 0, "target fps must be positive");
        ensure!(
            (0.0..=1.0).contains(&self.min_confidence),
            "min confidence must be within [0, 1], got {}",
            self.min_confidence
        );
        ensure!(self.blur_radius > 0.0, "blur radius must be positive");
        ensure!(self.blur_iterations > 0, "blur iterations must be positive");
        ensure!(
            self.fallback_blur_radius > 0,
            "fallback blur radius must be positive"
        );
        Ok(())
    }

    /// Time budget for a single tick at the target frame rate.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.target_fps.max(1) as f32)
    }
}
