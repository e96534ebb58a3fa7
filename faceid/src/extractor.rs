use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::{Detection, FaceDetection, FaceIdError, ImageBuffer};

/// Turns images into face embeddings.
///
/// Both calls may take hundreds of milliseconds. Callers must not issue a
/// second call on the same frame source before the first one resolves.
///
/// Implementations must be safe for concurrent use (Send + Sync).
#[async_trait]
pub trait FaceExtractor: Send + Sync {
    /// Detects the single best face, for enrollment.
    async fn detect_single(&self, image: &ImageBuffer) -> Result<Detection, FaceIdError>;

    /// Detects every face in a frame, for scanning.
    async fn detect_all(&self, image: &ImageBuffer) -> Result<Vec<FaceDetection>, FaceIdError>;

    /// Returns the dimensionality of the produced embeddings (e.g. 128).
    fn dimension(&self) -> usize;
}

/// Loads model weights and builds a ready [`FaceExtractor`].
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn FaceExtractor>, FaceIdError>;

    /// Dimension the loaded model is expected to produce.
    fn dimension(&self) -> usize;
}

/// An explicitly owned, lazily loaded face model.
///
/// The model is loaded at most once: [`LazyExtractor::ensure_loaded`] is
/// idempotent and concurrent callers share a single load. A failed load
/// leaves the extractor unloaded so a later call can retry. Detection calls
/// before a successful load fail with [`FaceIdError::ModelNotLoaded`].
pub struct LazyExtractor {
    loader: Box<dyn ModelLoader>,
    model: OnceCell<Arc<dyn FaceExtractor>>,
}

impl LazyExtractor {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            model: OnceCell::new(),
        }
    }

    /// Loads the model if needed and returns it.
    pub async fn ensure_loaded(&self) -> Result<Arc<dyn FaceExtractor>, FaceIdError> {
        let model = self
            .model
            .get_or_try_init(|| async {
                info!(dim = self.loader.dimension(), "loading face model");
                let model = self.loader.load().await?;
                if model.dimension() != self.loader.dimension() {
                    return Err(FaceIdError::DimensionMismatch {
                        expected: self.loader.dimension(),
                        got: model.dimension(),
                    });
                }
                debug!("face model ready");
                Ok(model)
            })
            .await?;
        Ok(model.clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    fn loaded(&self) -> Result<&Arc<dyn FaceExtractor>, FaceIdError> {
        self.model.get().ok_or(FaceIdError::ModelNotLoaded)
    }
}

#[async_trait]
impl FaceExtractor for LazyExtractor {
    async fn detect_single(&self, image: &ImageBuffer) -> Result<Detection, FaceIdError> {
        self.loaded()?.detect_single(image).await
    }

    async fn detect_all(&self, image: &ImageBuffer) -> Result<Vec<FaceDetection>, FaceIdError> {
        self.loaded()?.detect_all(image).await
    }

    fn dimension(&self) -> usize {
        self.loader.dimension()
    }
}
