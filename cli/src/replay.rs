//! Offline stand-ins for the camera and the face model.
//!
//! The face model runs outside this tool. Its output is recorded as JSON
//! and replayed here: [`PrecomputedExtractor`] answers detection calls from
//! recorded detections, and [`ReplayFrameSource`] plays a JSONL recording
//! of camera frames, one [`RecordedFrame`] per line.
//!
//! ```text
//! {"faces": [{"box": {...}, "score": 0.98, "embedding": [...]}]}
//! {"faces": []}
//! {"unavailable": true}
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use facecrm_faceid::{
    Detection, FaceDetection, FaceExtractor, FaceIdError, ImageBuffer, ModelLoader,
};
use facecrm_recognize::{Frame, FrameConstraints, FrameError, FrameSource};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Identifies an image by mime type and content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ImageKey(String, Vec<u8>);

impl ImageKey {
    fn of(image: &ImageBuffer) -> Self {
        Self(image.mime.clone(), image.data.to_vec())
    }
}

/// [`FaceExtractor`] backed by recorded detections.
///
/// Images that were never registered contain no face.
pub struct PrecomputedExtractor {
    dimension: usize,
    faces: RwLock<HashMap<ImageKey, Vec<FaceDetection>>>,
}

impl PrecomputedExtractor {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            faces: RwLock::new(HashMap::new()),
        }
    }

    /// Records the detections the model produced for `image`.
    pub fn register(&self, image: &ImageBuffer, faces: Vec<FaceDetection>) {
        self.faces.write().insert(ImageKey::of(image), faces);
    }

    pub fn len(&self) -> usize {
        self.faces.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.read().is_empty()
    }
}

#[async_trait]
impl FaceExtractor for PrecomputedExtractor {
    async fn detect_single(&self, image: &ImageBuffer) -> Result<Detection, FaceIdError> {
        Ok(Detection::best_of(self.detect_all(image).await?))
    }

    async fn detect_all(&self, image: &ImageBuffer) -> Result<Vec<FaceDetection>, FaceIdError> {
        if image.is_empty() {
            return Err(FaceIdError::InvalidImage("empty image".into()));
        }
        Ok(self
            .faces
            .read()
            .get(&ImageKey::of(image))
            .cloned()
            .unwrap_or_default())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// [`ModelLoader`] that hands out a prepared [`PrecomputedExtractor`].
pub struct PrecomputedLoader {
    extractor: Arc<PrecomputedExtractor>,
}

impl PrecomputedLoader {
    pub fn new(extractor: Arc<PrecomputedExtractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl ModelLoader for PrecomputedLoader {
    async fn load(&self) -> Result<Arc<dyn FaceExtractor>, FaceIdError> {
        debug!(images = self.extractor.len(), "recorded detections loaded");
        Ok(self.extractor.clone())
    }

    fn dimension(&self) -> usize {
        self.extractor.dimension()
    }
}

/// One line of a frame recording.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// Faces the model found in this frame.
    #[serde(default)]
    pub faces: Vec<FaceDetection>,

    /// The camera had no frame at this point.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unavailable: bool,
}

/// [`FrameSource`] that plays recorded frames once, then reports
/// [`Frame::Unavailable`].
pub struct ReplayFrameSource {
    frames: Vec<Frame>,
    cursor: AtomicUsize,
    acquired: AtomicBool,
}

impl ReplayFrameSource {
    /// Builds a source from recorded frames and registers their detections
    /// with `extractor`.
    pub fn new(recorded: Vec<RecordedFrame>, extractor: &PrecomputedExtractor) -> Self {
        let frames = recorded
            .into_iter()
            .enumerate()
            .map(|(i, rec)| {
                if rec.unavailable {
                    return Frame::Unavailable;
                }
                let image = ImageBuffer::new("image/x-replay", format!("frame-{i}").into_bytes());
                extractor.register(&image, rec.faces);
                Frame::Ready(image)
            })
            .collect();
        Self {
            frames,
            cursor: AtomicUsize::new(0),
            acquired: AtomicBool::new(false),
        }
    }

    /// Number of recorded frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// True once the source has been polled past its last frame.
    pub fn finished(&self) -> bool {
        self.cursor.load(Ordering::SeqCst) > self.frames.len()
    }
}

#[async_trait]
impl FrameSource for ReplayFrameSource {
    async fn acquire(&self, constraints: &FrameConstraints) -> Result<(), FrameError> {
        if self.frames.is_empty() {
            return Err(FrameError::Device("recording has no frames".into()));
        }
        self.cursor.store(0, Ordering::SeqCst);
        self.acquired.store(true, Ordering::SeqCst);
        debug!(
            frames = self.frames.len(),
            width = constraints.width,
            height = constraints.height,
            "replay started"
        );
        Ok(())
    }

    async fn current_frame(&self) -> Result<Frame, FrameError> {
        if !self.acquired.load(Ordering::SeqCst) {
            return Err(FrameError::NotAcquired);
        }
        let i = self.cursor.fetch_add(1, Ordering::SeqCst);
        trace!(frame = i, "replay frame");
        Ok(self.frames.get(i).cloned().unwrap_or(Frame::Unavailable))
    }

    async fn release(&self) {
        self.acquired.store(false, Ordering::SeqCst);
    }
}

/// Parses a JSONL frame recording. Blank lines are skipped.
pub fn parse_recording(text: &str) -> anyhow::Result<Vec<RecordedFrame>> {
    let mut frames = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let frame = serde_json::from_str(line)
            .map_err(|e| anyhow::anyhow!("line {}: {}", n + 1, e))?;
        frames.push(frame);
    }
    Ok(frames)
}

/// Reads a JSONL frame recording from disk.
pub async fn load_recording(path: impl AsRef<Path>) -> anyhow::Result<Vec<RecordedFrame>> {
    let text = tokio::fs::read_to_string(path.as_ref()).await?;
    parse_recording(&text)
}
