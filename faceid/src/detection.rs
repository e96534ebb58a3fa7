use serde::{Deserialize, Serialize};

use crate::Embedding;

/// Bounding box of a detected face, in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One face found in a frame together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,

    /// Detector confidence in [0, 1].
    #[serde(default = "default_score")]
    pub score: f32,

    pub embedding: Embedding,
}

fn default_score() -> f32 {
    1.0
}

/// Result of single-face detection.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Detected {
        bbox: BoundingBox,
        score: f32,
        embedding: Embedding,
    },
    NotDetected,
}

impl Detection {
    /// Picks the most confident detection; the earliest wins a tie.
    pub fn best_of(detections: Vec<FaceDetection>) -> Self {
        let mut best: Option<FaceDetection> = None;
        for det in detections {
            match &best {
                Some(b) if det.score <= b.score => {}
                _ => best = Some(det),
            }
        }
        match best {
            Some(d) => Detection::Detected {
                bbox: d.bbox,
                score: d.score,
                embedding: d.embedding,
            },
            None => Detection::NotDetected,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, Detection::Detected { .. })
    }

    pub fn embedding(&self) -> Option<&Embedding> {
        match self {
            Detection::Detected { embedding, .. } => Some(embedding),
            Detection::NotDetected => None,
        }
    }
}
