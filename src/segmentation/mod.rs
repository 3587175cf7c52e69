mod driver;
mod preprocess;
mod selfie;
pub mod types;

pub use driver::{PendingMask, SegmentationResult, Segmenter};
pub use selfie::{SelfieSegmenter, DEFAULT_INPUT_SIZE};
pub use types::{ModelLoader, SegmentationModel};

use anyhow::Result;

/// Create a loader for the default segmentation model (selfie segmenter)
///
/// Nothing is read until the loader runs on the segmentation worker.
pub fn default_model_loader(model_path: String, input_size: (u32, u32)) -> ModelLoader {
    Box::new(move || -> Result<Box<dyn SegmentationModel>> {
        let model = SelfieSegmenter::new(&model_path, input_size)?;
        Ok(Box::new(model))
    })
}
