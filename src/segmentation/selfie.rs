use super::preprocess::{extract_confidence, postprocess_mask, Preprocessor};
use super::types::SegmentationModel;
use crate::frame::{ConfidenceMask, Frame};
use anyhow::{Context, Result};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

/// Default model input edge for the square selfie segmenter.
pub const DEFAULT_INPUT_SIZE: u32 = 256;

/// MediaPipe-style selfie segmenter exported to ONNX
///
/// Takes a `[1, H, W, 3]` float image in [0, 1] and returns per-pixel
/// confidence, either as a single person plane or as class scores with
/// background first (the multiclass variant).
pub struct SelfieSegmenter {
    session: Session,
    preprocessor: Preprocessor,
    width: u32,
    height: u32,
    last_timestamp_ms: Option<u64>,
}

impl SelfieSegmenter {
    /// Load a selfie segmentation model from an ONNX file
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `input_size` - Model input (width, height), e.g. 256x256 or 256x144 (landscape)
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: (u32, u32)) -> Result<Self> {
        let path = model_path.as_ref();
        let (width, height) = input_size;

        tracing::info!("Loading selfie segmenter from {}", path.display());

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra-op threads")?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        tracing::info!("Selfie segmenter loaded ({}x{} input)", width, height);

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(width, height),
            width,
            height,
            last_timestamp_ms: None,
        })
    }
}

impl SegmentationModel for SelfieSegmenter {
    fn segment(&mut self, frame: &Frame, timestamp_ms: u64) -> Result<ConfidenceMask> {
        let _span = tracing::debug_span!("selfie_segment", timestamp_ms).entered();

        if let Some(last) = self.last_timestamp_ms {
            if timestamp_ms < last {
                tracing::warn!("Frame timestamp went backwards ({} < {})", timestamp_ms, last);
            }
        }
        self.last_timestamp_ms = Some(timestamp_ms);

        let input = self.preprocessor.preprocess(frame);
        let shape = [1usize, self.height as usize, self.width as usize, 3];
        let tensor = Tensor::from_array((shape, input.into_raw_vec().into_boxed_slice()))
            .context("Failed to create input tensor")?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("Failed to run inference")?;
        drop(_infer_span);

        let (out_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract confidence tensor")?;
        let out_shape: Vec<i64> = out_shape.iter().copied().collect();

        let values = extract_confidence(&out_shape, data, self.width, self.height)?;

        let (frame_width, frame_height) = frame.dimensions();
        postprocess_mask(values, self.width, self.height, frame_width, frame_height)
    }

    fn reset_state(&mut self) {
        tracing::debug!("Resetting selfie segmenter timestamps");
        self.last_timestamp_ms = None;
    }

    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
