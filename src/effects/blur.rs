use crate::config::{BlurStrategyChoice, PipelineConfig};
use crate::frame::{Frame, CHANNELS};

/// How the background copy of a frame gets blurred.
///
/// Chosen once by [`BlurStrategy::negotiate`] and reused for every frame.
#[derive(Debug, Clone, PartialEq)]
pub enum BlurStrategy {
    /// `iterations` Gaussian passes of `sigma`, approximated by three box passes
    /// of the combined sigma.
    Filter { sigma: f32, iterations: u32 },
    /// Triangular (stack) kernel built from two clamped box passes.
    Stack { radius: u32 },
}

/// Engines matching this rule get the stack blur instead of the filter.
///
/// The hint follows user-agent conventions: WebKit identifies as "safari",
/// Blink as "safari" plus "chrome".
pub fn lacks_reliable_filter(engine_hint: &str) -> bool {
    let hint = engine_hint.to_lowercase();
    hint.contains("safari") && !hint.contains("chrome")
}

impl BlurStrategy {
    pub fn negotiate(config: &PipelineConfig, engine_hint: Option<&str>) -> Self {
        let filter = Self::Filter {
            sigma: config.blur_radius,
            iterations: config.blur_iterations,
        };
        let stack = Self::Stack {
            radius: config.fallback_blur_radius,
        };

        let strategy = match config.blur_strategy {
            BlurStrategyChoice::Filter => filter,
            BlurStrategyChoice::Stack => stack,
            BlurStrategyChoice::Auto => match engine_hint {
                Some(hint) if lacks_reliable_filter(hint) => stack,
                _ => filter,
            },
        };

        tracing::info!("Using blur strategy {:?}", strategy);
        strategy
    }

    /// Produce a blurred copy of `frame` with identical dimensions.
    pub fn blur(&self, frame: &Frame) -> Frame {
        let _span = tracing::debug_span!("blur").entered();

        match *self {
            Self::Filter { sigma, iterations } => {
                // n passes of sigma equal one pass of sigma * sqrt(n)
                let combined = sigma * (iterations.max(1) as f32).sqrt();
                gaussian_box_radii(combined)
                    .iter()
                    .fold(frame.clone(), |acc, &radius| box_blur(&acc, radius))
            }
            Self::Stack { radius } => {
                let half = (radius as usize).div_ceil(2);
                let once = box_blur(frame, half);
                box_blur(&once, half)
            }
        }
    }
}

/// Radii of three box passes whose combined variance matches `sigma`.
fn gaussian_box_radii(sigma: f32) -> [usize; 3] {
    const PASSES: f32 = 3.0;
    let variance = 12.0 * sigma * sigma;

    let ideal = (variance / PASSES + 1.0).sqrt();
    let mut lower = ideal.floor().max(1.0);
    if lower as u32 % 2 == 0 {
        lower -= 1.0;
    }
    let upper = lower + 2.0;

    let split = (variance - PASSES * lower * lower - 4.0 * PASSES * lower - 3.0 * PASSES)
        / (-4.0 * lower - 4.0);
    let split = split.round().clamp(0.0, PASSES) as usize;

    let mut radii = [0usize; 3];
    for (i, radius) in radii.iter_mut().enumerate() {
        let width = if i < split { lower } else { upper };
        *radius = ((width - 1.0) / 2.0) as usize;
    }
    radii
}

/// Separable box blur. Samples outside the frame are skipped, so border
/// pixels average over fewer neighbours.
pub fn box_blur(frame: &Frame, radius: usize) -> Frame {
    let (width, height) = frame.dimensions();
    let (w, h) = (width as usize, height as usize);
    if radius == 0 || w == 0 || h == 0 {
        return frame.clone();
    }

    let src = frame.as_raw();
    let mut horizontal = vec![0u8; src.len()];
    for y in 0..h {
        blur_line(src, &mut horizontal, y * w * CHANNELS, CHANNELS, w, radius);
    }

    let mut out = vec![0u8; src.len()];
    for x in 0..w {
        blur_line(&horizontal, &mut out, x * CHANNELS, w * CHANNELS, h, radius);
    }

    Frame::from_raw(width, height, out).unwrap_or_else(|| frame.clone())
}

/// Running-sum box filter over `len` pixels starting at `start`, stepping `stride` bytes.
fn blur_line(src: &[u8], dst: &mut [u8], start: usize, stride: usize, len: usize, radius: usize) {
    let at = |i: usize| start + i * stride;

    let mut sum = [0u32; CHANNELS];
    let mut count = 0u32;
    for i in 0..=radius.min(len - 1) {
        for (c, s) in sum.iter_mut().enumerate() {
            *s += src[at(i) + c] as u32;
        }
        count += 1;
    }

    for i in 0..len {
        let offset = at(i);
        for (c, s) in sum.iter().enumerate() {
            dst[offset + c] = ((s + count / 2) / count) as u8;
        }

        let incoming = i + radius + 1;
        if incoming < len {
            for (c, s) in sum.iter_mut().enumerate() {
                *s += src[at(incoming) + c] as u32;
            }
            count += 1;
        }
        if i >= radius {
            for (c, s) in sum.iter_mut().enumerate() {
                *s -= src[at(i - radius) + c] as u32;
            }
            count -= 1;
        }
    }
}
