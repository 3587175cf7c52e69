use crate::config::ForegroundSource;
use crate::error::PipelineError;
use crate::frame::{ConfidenceMask, Frame, CHANNELS};

/// Foreground decision for a single pixel. Ties go to the foreground.
#[inline]
pub fn classify(confidence: f32, threshold: f32) -> bool {
    confidence >= threshold
}

/// Merge `sharp` and `blurred` according to `mask`.
///
/// `sharp` is consumed and reused as the output buffer. Only R, G and B are
/// written; alpha keeps the sharp frame's value at every pixel.
pub fn composite(
    mut sharp: Frame,
    blurred: &Frame,
    mask: &ConfidenceMask,
    threshold: f32,
    foreground: ForegroundSource,
) -> Result<Frame, PipelineError> {
    let _span = tracing::debug_span!("composite").entered();

    let dims = sharp.dimensions();
    if blurred.dimensions() != dims {
        return Err(PipelineError::DimensionMismatch {
            expected: dims,
            actual: blurred.dimensions(),
        });
    }
    if mask.dimensions() != dims {
        return Err(PipelineError::DimensionMismatch {
            expected: dims,
            actual: mask.dimensions(),
        });
    }

    let blur_foreground = foreground == ForegroundSource::Blurred;
    let dst: &mut [u8] = &mut sharp;
    let src = blurred.as_raw();

    for (i, &confidence) in mask.values().iter().enumerate() {
        if classify(confidence, threshold) == blur_foreground {
            let offset = i * CHANNELS;
            dst[offset..offset + 3].copy_from_slice(&src[offset..offset + 3]);
        }
    }

    Ok(sharp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sharp_2x2() -> Frame {
        Frame::from_fn(2, 2, |x, y| {
            let v = (10 * (y * 2 + x + 1)) as u8;
            Rgba([v, v + 1, v + 2, 255])
        })
    }

    fn blurred_2x2() -> Frame {
        Frame::from_pixel(2, 2, Rgba([200, 201, 202, 255]))
    }

    #[test]
    fn classify_is_inclusive_at_threshold() {
        assert!(classify(0.4, 0.4));
        assert!(classify(0.9, 0.4));
        assert!(!classify(0.399, 0.4));
        assert!(classify(1.5, 0.4));
        assert!(!classify(-0.1, 0.4));
    }

    #[test]
    fn full_confidence_keeps_sharp_frame() {
        let sharp = sharp_2x2();
        let mask = ConfidenceMask::filled(2, 2, 1.0);
        let out = composite(sharp.clone(), &blurred_2x2(), &mask, 0.4, ForegroundSource::Sharp)
            .unwrap();
        assert_eq!(out, sharp);
    }

    #[test]
    fn zero_confidence_yields_blurred_frame() {
        let blurred = blurred_2x2();
        let mask = ConfidenceMask::filled(2, 2, 0.0);
        let out = composite(sharp_2x2(), &blurred, &mask, 0.4, ForegroundSource::Sharp).unwrap();
        assert_eq!(out, blurred);
    }

    #[test]
    fn mixed_mask_selects_per_pixel() {
        let sharp = sharp_2x2();
        let blurred = blurred_2x2();
        let mask = ConfidenceMask::new(2, 2, vec![0.9, 0.1, 0.5, 0.5]).unwrap();
        let out = composite(sharp.clone(), &blurred, &mask, 0.4, ForegroundSource::Sharp).unwrap();

        assert_eq!(out.get_pixel(0, 0), sharp.get_pixel(0, 0));
        assert_eq!(out.get_pixel(1, 0), blurred.get_pixel(1, 0));
        assert_eq!(out.get_pixel(0, 1), sharp.get_pixel(0, 1));
        assert_eq!(out.get_pixel(1, 1), sharp.get_pixel(1, 1));
    }

    #[test]
    fn blurred_foreground_inverts_selection() {
        let sharp = sharp_2x2();
        let blurred = blurred_2x2();
        let mask = ConfidenceMask::new(2, 2, vec![0.9, 0.1, 0.5, 0.5]).unwrap();
        let out = composite(sharp.clone(), &blurred, &mask, 0.4, ForegroundSource::Blurred)
            .unwrap();

        assert_eq!(out.get_pixel(0, 0), blurred.get_pixel(0, 0));
        assert_eq!(out.get_pixel(1, 0), sharp.get_pixel(1, 0));
    }

    #[test]
    fn changing_one_mask_value_touches_one_pixel() {
        let blurred = blurred_2x2();
        let before = ConfidenceMask::filled(2, 2, 1.0);
        let after = ConfidenceMask::new(2, 2, vec![1.0, 1.0, 0.0, 1.0]).unwrap();

        let a = composite(sharp_2x2(), &blurred, &before, 0.4, ForegroundSource::Sharp).unwrap();
        let b = composite(sharp_2x2(), &blurred, &after, 0.4, ForegroundSource::Sharp).unwrap();

        let changed: Vec<usize> = a
            .pixels()
            .zip(b.pixels())
            .enumerate()
            .filter(|(_, (p, q))| p != q)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(changed, vec![2]);
    }

    #[test]
    fn alpha_comes_from_sharp_frame() {
        let sharp = Frame::from_fn(2, 2, |x, y| Rgba([0, 0, 0, (x + 2 * y) as u8 * 40]));
        let blurred = Frame::from_pixel(2, 2, Rgba([90, 90, 90, 7]));
        let mask = ConfidenceMask::new(2, 2, vec![0.0, 1.0, 0.0, 1.0]).unwrap();
        let out = composite(sharp.clone(), &blurred, &mask, 0.4, ForegroundSource::Sharp).unwrap();

        for (o, s) in out.pixels().zip(sharp.pixels()) {
            assert_eq!(o[3], s[3]);
        }
        assert_eq!(out.get_pixel(0, 0).0, [90, 90, 90, 0]);
    }

    #[test]
    fn mismatched_mask_is_rejected() {
        let mask = ConfidenceMask::filled(3, 2, 1.0);
        let err = composite(sharp_2x2(), &blurred_2x2(), &mask, 0.4, ForegroundSource::Sharp)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DimensionMismatch {
                expected: (2, 2),
                actual: (3, 2)
            }
        ));
    }
}
