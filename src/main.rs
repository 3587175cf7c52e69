mod capture;
mod config;
mod effects;
mod error;
mod frame;
mod output;
mod pipeline;
mod segmentation;

use anyhow::{Context, Result};
use capture::{CaptureSource, WebcamCapture};
use clap::Parser;
use config::{BlurStrategyChoice, ForegroundSource, PipelineConfig};
use effects::BlurStrategy;
use error::PipelineError;
use output::{OutputSink, V4L2Output};
use pipeline::{LoaderFactory, RenderLoop};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Output v4l2loopback device path
    #[arg(short, long, default_value = "/dev/video10")]
    output_device: String,

    /// Capture resolution width
    #[arg(long, default_value_t = 640)]
    capture_width: u32,

    /// Capture resolution height
    #[arg(long, default_value_t = 480)]
    capture_height: u32,

    /// Output resolution width
    #[arg(long, default_value_t = 640)]
    output_width: u32,

    /// Output resolution height
    #[arg(long, default_value_t = 480)]
    output_height: u32,

    /// Target frames per second
    #[arg(long, default_value_t = config::DEFAULT_TARGET_FPS)]
    fps: u32,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Path to segmentation model (ONNX file)
    /// If not provided, runs in passthrough mode without blur
    #[arg(long)]
    model: Option<String>,

    /// Model input width
    #[arg(long, default_value_t = segmentation::DEFAULT_INPUT_SIZE)]
    model_width: u32,

    /// Model input height
    #[arg(long, default_value_t = segmentation::DEFAULT_INPUT_SIZE)]
    model_height: u32,

    /// Show the confidence mask (grayscale silhouette) instead of the composite
    #[arg(long)]
    show_mask: bool,

    /// Confidence at or above which a pixel is kept as foreground
    #[arg(long, default_value_t = config::DEFAULT_MIN_CONFIDENCE)]
    min_confidence: f32,

    /// Gaussian blur radius for the filter strategy
    #[arg(long, default_value_t = config::DEFAULT_BLUR_RADIUS)]
    blur_radius: f32,

    /// Number of filter passes
    #[arg(long, default_value_t = config::DEFAULT_BLUR_ITERATIONS)]
    blur_iterations: u32,

    /// Kernel radius for the stack blur strategy
    #[arg(long, default_value_t = config::DEFAULT_FALLBACK_BLUR_RADIUS)]
    fallback_blur_radius: u32,

    /// Blur implementation
    #[arg(long, value_enum, default_value_t = BlurStrategyChoice::Auto)]
    blur_strategy: BlurStrategyChoice,

    /// Engine identification used when the blur strategy is auto
    #[arg(long)]
    user_agent: Option<String>,

    /// Which frame supplies foreground pixels
    #[arg(long, value_enum, default_value_t = ForegroundSource::Sharp)]
    foreground: ForegroundSource,

    /// Cancel segmentation requests older than this (milliseconds)
    #[arg(long, default_value_t = config::DEFAULT_SEGMENTATION_TIMEOUT_MS)]
    segmentation_timeout_ms: u64,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            min_confidence: self.min_confidence,
            blur_radius: self.blur_radius,
            blur_iterations: self.blur_iterations,
            fallback_blur_radius: self.fallback_blur_radius,
            foreground_source: self.foreground,
            blur_strategy: self.blur_strategy,
            target_fps: self.fps,
            segmentation_timeout: Duration::from_millis(self.segmentation_timeout_ms),
            show_mask: self.show_mask,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = args.pipeline_config();
    config.validate().context("Invalid pipeline configuration")?;

    tracing::info!("Blurcam starting");
    tracing::info!("Capture: {}x{}", args.capture_width, args.capture_height);
    tracing::info!("Output: {}x{}", args.output_width, args.output_height);
    tracing::info!("Target FPS: {}", config.target_fps);
    tracing::info!("Min confidence: {}", config.min_confidence);

    if config.foreground_source == ForegroundSource::Blurred {
        tracing::warn!(
            "Foreground source is 'blurred': the subject will be blurred, not the background"
        );
    }

    // Initialize capture
    let capture = WebcamCapture::new(
        args.input_device,
        args.capture_width,
        args.capture_height,
        config.target_fps,
    )
    .map_err(|e| PipelineError::DeviceAcquisitionFailure(format!("{e:#}")))?;
    let (native_width, native_height) = capture.resolution();
    tracing::info!("Video source: {}x{}", native_width, native_height);

    // Initialize output
    let output = V4L2Output::new(&args.output_device, args.output_width, args.output_height)
        .context("Failed to initialize v4l2loopback output")?;
    let (out_width, out_height) = output.resolution();
    tracing::debug!("Output sink ready at {}x{}", out_width, out_height);

    let blur = BlurStrategy::negotiate(&config, args.user_agent.as_deref());
    let mut render_loop = RenderLoop::new(capture, output, blur, config);

    let model_size = (args.model_width, args.model_height);
    let make_loader = args.model.clone().map(|model_path| {
        move || segmentation::default_model_loader(model_path.clone(), model_size)
    });
    let loaders = make_loader.as_ref().map(|make| make as LoaderFactory<'_>);

    let toggle = Arc::new(AtomicBool::new(false));
    if let Some(loaders) = loaders {
        render_loop
            .enter_blur_mode(loaders())
            .context("Failed to start segmentation")?;

        // Each line on stdin flips blur mode
        let flag = Arc::clone(&toggle);
        thread::Builder::new()
            .name("blur-toggle".into())
            .spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    if line.is_err() {
                        break;
                    }
                    flag.store(true, Ordering::Relaxed);
                }
            })
            .context("Failed to spawn blur toggle thread")?;
        tracing::info!("Press Enter to toggle blur");
    } else {
        tracing::info!("Running in passthrough mode (no segmentation)");
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        tracing::info!("Interrupt received, stopping");
        flag.store(true, Ordering::Relaxed);
    })
    .context("Failed to install Ctrl-C handler")?;

    tracing::info!("Press Ctrl+C to stop");
    render_loop.run(&shutdown, &toggle, loaders)?;

    tracing::info!("Blurcam stopped (last fps {})", render_loop.fps());
    Ok(())
}
