use serde::Serialize;
use thiserror::Error;

/// Errors returned by embedding, gallery and extractor operations.
#[derive(Debug, Error)]
pub enum FaceIdError {
    #[error("faceid: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("faceid: invalid embedding: {0}")]
    InvalidEmbedding(String),

    #[error("faceid: invalid image: {0}")]
    InvalidImage(String),

    #[error("faceid: model not loaded")]
    ModelNotLoaded,

    #[error("faceid: model error: {0}")]
    Model(String),

    #[error("faceid: extraction failed: {0}")]
    Extraction(String),
}

impl FaceIdError {
    /// Reports whether the error is a configuration or programming error
    /// rather than a transient runtime condition.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FaceIdError::DimensionMismatch { .. } | FaceIdError::ModelNotLoaded
        )
    }
}

/// Errors returned by [`crate::ContactRepository`] implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("repository: contact not found: {0}")]
    NotFound(String),

    #[error("repository: storage error: {0}")]
    Storage(String),
}

/// A single rejected form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors returned by the enrollment pipeline.
///
/// Face detection and field validation are evaluated independently, so a
/// capture with no face and an incomplete form yields a single
/// [`EnrollmentError::NoFaceAndInvalid`] carrying every field problem.
#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("enroll: no face detected")]
    NoFaceDetected,

    #[error("enroll: validation failed: {}", join_fields(.0))]
    ValidationFailed(Vec<FieldError>),

    #[error("enroll: no face detected; validation failed: {}", join_fields(.0))]
    NoFaceAndInvalid(Vec<FieldError>),

    #[error("enroll: extraction failed: {0}")]
    Extraction(#[source] FaceIdError),

    #[error("enroll: persistence failed: {0}")]
    PersistenceFailed(#[source] RepositoryError),
}

impl EnrollmentError {
    /// Reports whether no face was found in the captured image.
    pub fn no_face(&self) -> bool {
        matches!(
            self,
            EnrollmentError::NoFaceDetected | EnrollmentError::NoFaceAndInvalid(_)
        )
    }

    /// Returns the rejected fields, empty when validation passed.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            EnrollmentError::ValidationFailed(f) | EnrollmentError::NoFaceAndInvalid(f) => f,
            _ => &[],
        }
    }

    /// Reports whether the user can fix the problem and try again.
    pub fn is_recoverable(&self) -> bool {
        match self {
            EnrollmentError::Extraction(e) => !e.is_fatal(),
            _ => true,
        }
    }
}
