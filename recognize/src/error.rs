use facecrm_faceid::RepositoryError;
use thiserror::Error;

/// Errors returned by [`crate::FrameSource`] implementations.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame source: already acquired by another session")]
    Busy,

    #[error("frame source: not acquired")]
    NotAcquired,

    #[error("frame source: device error: {0}")]
    Device(String),
}

/// Errors returned by [`crate::Recognizer`] operations.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("recognize: acquisition failed: {0}")]
    AcquisitionFailed(#[source] FrameError),

    #[error("recognize: gallery refresh failed: {0}")]
    Gallery(#[source] RepositoryError),
}
