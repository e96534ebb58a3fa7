//! Recognition state and the events surfaced to the UI.

use std::fmt;

use facecrm_faceid::MatchResult;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`crate::Recognizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionState {
    #[default]
    Idle,
    Starting,
    Scanning,
    Stopping,
}

impl RecognitionState {
    /// Returns true while a session exists.
    pub fn is_active(&self) -> bool {
        !matches!(self, RecognitionState::Idle)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecognitionState::Idle => "idle",
            RecognitionState::Starting => "starting",
            RecognitionState::Scanning => "scanning",
            RecognitionState::Stopping => "stopping",
        }
    }
}

impl fmt::Display for RecognitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What changed about the recognized identity in the last cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchTransition {
    /// Lifecycle change only.
    None,
    /// Nobody recognized any more (or not yet, on the first cycle).
    NoMatch,
    /// A contact recognized for the first time this session.
    Matched { contact_id: String },
    /// A contact recognized again after someone else or nobody was in view.
    Reseen { contact_id: String },
}

/// Classification of surfaced errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Frame source could not be opened. The session did not start.
    AcquisitionFailed,
    /// One extraction call failed. Scanning continues.
    ExtractionFailed,
    /// Contacts could not be loaded. The previous gallery is kept.
    GalleryLoadFailed,
    /// An embedding had the wrong dimension. The session was stopped.
    DimensionMismatch,
    /// The face model is not loaded. The session was stopped.
    ModelUnavailable,
}

/// Snapshot published on every transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionUpdate {
    pub state: RecognitionState,
    pub current_match: Option<MatchResult>,
    pub transition: MatchTransition,
}

/// Event delivered to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecognitionEvent {
    Update(RecognitionUpdate),
    Error { kind: ErrorKind, message: String },
}

impl RecognitionEvent {
    pub fn as_update(&self) -> Option<&RecognitionUpdate> {
        match self {
            RecognitionEvent::Update(u) => Some(u),
            RecognitionEvent::Error { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            RecognitionEvent::Error { kind, .. } => Some(*kind),
            RecognitionEvent::Update(_) => None,
        }
    }
}
