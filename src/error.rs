use thiserror::Error;

/// Failures the blur pipeline distinguishes between.
///
/// Only `CollaboratorInitFailure` and `DeviceAcquisitionFailure` ever reach the
/// user; everything else is absorbed by the render loop as a dropped frame.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("segmentation model is not ready")]
    CollaboratorUnavailable,

    #[error("failed to initialize segmentation model: {0}")]
    CollaboratorInitFailure(String),

    #[error("failed to acquire video device: {0}")]
    DeviceAcquisitionFailure(String),

    #[error(
        "dimension mismatch: expected {}x{}, got {}x{}",
        expected.0,
        expected.1,
        actual.0,
        actual.1
    )]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("segmentation failed: {0}")]
    Segmentation(String),

    #[error("segmentation request was cancelled")]
    Cancelled,
}
