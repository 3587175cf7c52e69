use crate::frame::{ConfidenceMask, Frame};
use anyhow::Result;

/// Trait for segmentation models
/// Allows swapping between different backends (selfie segmenter, test doubles, ...)
pub trait SegmentationModel: Send {
    /// Produce a foreground confidence mask for `frame`
    ///
    /// # Arguments
    /// * `frame` - Input RGBA frame
    /// * `timestamp_ms` - Capture time, monotonically increasing within a session
    ///
    /// # Returns
    /// * Mask with the same dimensions as `frame`
    fn segment(&mut self, frame: &Frame, timestamp_ms: u64) -> Result<ConfidenceMask>;

    /// Reset internal state (for models with temporal components)
    ///
    /// Called once per blur-mode session, right after loading.
    fn reset_state(&mut self) {
        // Default implementation: no-op for stateless models
    }

    /// Get the model's preferred input dimensions
    ///
    /// Returns (width, height)
    fn input_size(&self) -> (u32, u32);
}

/// Deferred model construction, run on the segmentation worker thread.
pub type ModelLoader = Box<dyn FnOnce() -> Result<Box<dyn SegmentationModel>> + Send>;
