//! Continuous face recognition over a live frame source.
//!
//! ```text
//!            start()                     acquired
//!   Idle ─────────────▶ Starting ─────────────────▶ Scanning ──┐
//!    ▲                     │ acquisition failed,       │   ▲    │ cycle:
//!    │                     ▼                           │   └────┘ frame → extract → match
//!    │                     │ stop() while starting     │   │    │
//!    ├──────────────────── Idle / Stopping             │ stop(), fatal error, drop
//!    └──────────────────── Stopping ◀──────────────────┘
//! ```
//!
//! The [`Recognizer`] owns one session at a time, a gallery snapshot per
//! session and the frame source while scanning. State changes and match
//! transitions are published as [`RecognitionEvent`]s.

mod config;
mod error;
mod event;
mod frame;
mod recognizer;
mod throttle;

pub use config::RecognizerConfig;
pub use error::{FrameError, RecognitionError};
pub use event::{ErrorKind, MatchTransition, RecognitionEvent, RecognitionState, RecognitionUpdate};
pub use frame::{ExclusiveFrameSource, Frame, FrameConstraints, FrameSource};
pub use recognizer::{Recognizer, SessionSnapshot};
pub use throttle::LastSeenThrottle;

#[cfg(test)]
mod tests;
