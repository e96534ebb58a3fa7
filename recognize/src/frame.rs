//! Frame source abstraction.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use facecrm_faceid::ImageBuffer;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::FrameError;

/// Requested capture size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameConstraints {
    pub width: u32,
    pub height: u32,
}

impl Default for FrameConstraints {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

/// Result of polling a frame source.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Ready(ImageBuffer),
    /// No frame right now (stream paused, ended or still warming up).
    Unavailable,
}

/// A live or single-shot image feed.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Opens the feed.
    async fn acquire(&self, constraints: &FrameConstraints) -> Result<(), FrameError>;

    /// Returns the latest frame.
    async fn current_frame(&self) -> Result<Frame, FrameError>;

    /// Closes the feed. Releasing an idle source is a no-op.
    async fn release(&self);
}

/// Wraps a [`FrameSource`] so only one holder can acquire it at a time.
///
/// A second `acquire` while the source is held fails with
/// [`FrameError::Busy`] instead of silently sharing the stream.
pub struct ExclusiveFrameSource<S> {
    inner: S,
    held: AtomicBool,
}

impl<S: FrameSource> ExclusiveFrameSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            held: AtomicBool::new(false),
        }
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: FrameSource> FrameSource for ExclusiveFrameSource<S> {
    async fn acquire(&self, constraints: &FrameConstraints) -> Result<(), FrameError> {
        if self
            .held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(FrameError::Busy);
        }
        if let Err(e) = self.inner.acquire(constraints).await {
            self.held.store(false, Ordering::SeqCst);
            return Err(e);
        }
        debug!(width = constraints.width, height = constraints.height, "frame source acquired");
        Ok(())
    }

    async fn current_frame(&self) -> Result<Frame, FrameError> {
        if !self.is_held() {
            return Err(FrameError::NotAcquired);
        }
        self.inner.current_frame().await
    }

    async fn release(&self) {
        if self.held.swap(false, Ordering::SeqCst) {
            self.inner.release().await;
            debug!("frame source released");
        }
    }
}
