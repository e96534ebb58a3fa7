use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::FaceIdError;

/// Embedding dimension produced by the reference face recognition network.
pub const DEFAULT_DIMENSION: usize = 128;

/// An immutable face embedding.
///
/// Cloning is cheap: the components are shared behind an `Arc`. All
/// components are finite; the dimension is checked against the extractor's
/// dimension with [`Embedding::new`] or [`Embedding::ensure_dim`] before the
/// embedding reaches the matcher.
#[derive(Clone, PartialEq)]
pub struct Embedding(Arc<[f32]>);

impl Embedding {
    /// Creates an embedding of exactly `dim` finite components.
    pub fn new(values: Vec<f32>, dim: usize) -> Result<Self, FaceIdError> {
        let emb = Self::from_vec(values)?;
        emb.ensure_dim(dim)?;
        Ok(emb)
    }

    /// Creates an embedding without a dimension check.
    pub fn from_vec(values: Vec<f32>) -> Result<Self, FaceIdError> {
        if values.is_empty() {
            return Err(FaceIdError::InvalidEmbedding("empty vector".into()));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(FaceIdError::InvalidEmbedding(format!(
                "component {i} is not finite"
            )));
        }
        Ok(Self(values.into()))
    }

    /// Returns an error unless the embedding has `dim` components.
    pub fn ensure_dim(&self, dim: usize) -> Result<(), FaceIdError> {
        if self.0.len() != dim {
            return Err(FaceIdError::DimensionMismatch {
                expected: dim,
                got: self.0.len(),
            });
        }
        Ok(())
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.0.to_vec()
    }

    /// Euclidean distance to another embedding of the same dimension.
    pub fn distance(&self, other: &Embedding) -> f32 {
        euclidean_distance(&self.0, &other.0)
    }
}

impl fmt::Debug for Embedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Embedding")
            .field("dim", &self.0.len())
            .field("head", &&self.0[..self.0.len().min(4)])
            .finish()
    }
}

impl Serialize for Embedding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl<'de> Deserialize<'de> for Embedding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<f32>::deserialize(deserializer)?;
        Embedding::from_vec(values).map_err(serde::de::Error::custom)
    }
}

/// Computes the Euclidean (L2) distance between two vectors.
///
/// Accumulates in f64. Callers must pass vectors of equal length; the
/// dimension is validated when embeddings enter the system, not here.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "euclidean_distance: length mismatch");
    let mut sum: f64 = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let d = *x as f64 - *y as f64;
        sum += d * d;
    }
    sum.sqrt() as f32
}
