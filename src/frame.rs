use crate::error::PipelineError;
use image::RgbaImage;

/// A captured video frame: 4 channels (R, G, B, A) per pixel, row-major.
pub type Frame = RgbaImage;

/// Bytes per pixel in a [`Frame`].
pub const CHANNELS: usize = 4;

/// Per-pixel foreground confidence, index-aligned with a frame
/// (`index = y * width + x`).
///
/// Values are expected in `[0, 1]` but are never clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceMask {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl ConfidenceMask {
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self, PipelineError> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(PipelineError::DimensionMismatch {
                expected: (width, height),
                actual: (values.len() as u32, 1),
            });
        }

        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// A mask with the same confidence everywhere.
    pub fn filled(width: u32, height: u32, confidence: f32) -> Self {
        Self {
            width,
            height,
            values: vec![confidence; width as usize * height as usize],
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Render the mask as an opaque grayscale frame for debugging.
    pub fn to_frame(&self) -> Frame {
        Frame::from_fn(self.width, self.height, |x, y| {
            let idx = (y * self.width + x) as usize;
            let value = (self.values[idx] * 255.0).clamp(0.0, 255.0) as u8;
            image::Rgba([value, value, value, 255])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_value_count() {
        let err = ConfidenceMask::new(2, 2, vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, PipelineError::DimensionMismatch { .. }));
    }

    #[test]
    fn renders_mask_as_gray() {
        let mask = ConfidenceMask::new(2, 1, vec![0.0, 1.0]).unwrap();
        let frame = mask.to_frame();
        assert_eq!(frame.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(frame.get_pixel(1, 0).0, [255, 255, 255, 255]);
    }
}
