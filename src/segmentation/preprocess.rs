use crate::frame::{ConfidenceMask, Frame};
use anyhow::{bail, Context, Result};
use image::{imageops, ImageBuffer, Luma};
use ndarray::Array4;

/// Preprocessor for converting RGBA frames to model input tensors
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
        }
    }

    /// Preprocess a frame into a normalized NHWC tensor
    ///
    /// Steps:
    /// 1. Resize to target dimensions
    /// 2. Drop alpha, convert to float and normalize to [0, 1]
    ///
    /// Returns: Array4<f32> with shape [1, height, width, 3]
    pub fn preprocess(&self, frame: &Frame) -> Array4<f32> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized;
        let source = if frame.dimensions() != (self.target_width, self.target_height) {
            resized = imageops::resize(
                frame,
                self.target_width,
                self.target_height,
                imageops::FilterType::Triangle,
            );
            &resized
        } else {
            frame
        };

        let (width, height) = source.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, height as usize, width as usize, 3));

        for (x, y, pixel) in source.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
            }
        }

        tensor
    }
}

/// Pull the foreground plane out of a raw model output.
///
/// Accepts `[1, H, W, C]` or `[1, C, H, W]`. A single channel is read as
/// foreground confidence; with more channels, channel 0 is the background
/// class and foreground is its complement.
pub fn extract_confidence(
    shape: &[i64],
    data: &[f32],
    width: u32,
    height: u32,
) -> Result<Vec<f32>> {
    let (w, h) = (width as i64, height as i64);
    let plane = (width * height) as usize;

    let (channels, interleaved) = match shape {
        [1, sh, sw, c] if *sh == h && *sw == w => (*c as usize, true),
        [1, c, sh, sw] if *sh == h && *sw == w => (*c as usize, false),
        [1, sh, sw] if *sh == h && *sw == w => (1, true),
        _ if data.len() == plane => (1, true),
        _ => bail!("unexpected segmentation output shape {:?} for {}x{}", shape, width, height),
    };

    if channels == 0 || data.len() < plane * channels {
        bail!(
            "segmentation output has {} values, expected {}",
            data.len(),
            plane * channels.max(1)
        );
    }

    let values = match (channels, interleaved) {
        (1, _) => data[..plane].to_vec(),
        (c, true) => (0..plane).map(|i| 1.0 - data[i * c]).collect(),
        (_, false) => data[..plane].iter().map(|bg| 1.0 - bg).collect(),
    };

    Ok(values)
}

/// Resize a model-resolution mask back to frame dimensions
///
/// # Arguments
/// * `values` - Flattened mask at model resolution
/// * `mask_width` / `mask_height` - Model output dimensions
/// * `target_width` / `target_height` - Frame dimensions
pub fn postprocess_mask(
    values: Vec<f32>,
    mask_width: u32,
    mask_height: u32,
    target_width: u32,
    target_height: u32,
) -> Result<ConfidenceMask> {
    let _span = tracing::debug_span!("postprocess").entered();

    if (mask_width, mask_height) == (target_width, target_height) {
        return Ok(ConfidenceMask::new(target_width, target_height, values)?);
    }

    let plane: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_raw(mask_width, mask_height, values)
            .context("mask values do not cover the model output plane")?;

    // Triangle keeps interpolated values inside the source range
    let resized = imageops::resize(
        &plane,
        target_width,
        target_height,
        imageops::FilterType::Triangle,
    );

    Ok(ConfidenceMask::new(
        target_width,
        target_height,
        resized.into_raw(),
    )?)
}
