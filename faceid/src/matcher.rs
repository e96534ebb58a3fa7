use serde::{Deserialize, Serialize};

use crate::{DEFAULT_DIMENSION, Embedding, FaceIdError, Gallery, GalleryEntry};

/// Default maximum Euclidean distance for two faces to be the same person.
pub const DEFAULT_THRESHOLD: f32 = 0.6;

/// Controls matcher behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// A match requires distance strictly below this value.
    /// Lower = stricter (more unknowns), higher = more lenient.
    /// Default: 0.6.
    pub threshold: f32,

    /// Embedding dimension of the extractor. Default: 128.
    pub dimension: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            dimension: DEFAULT_DIMENSION,
        }
    }
}

/// Outcome of matching one query embedding against a gallery.
///
/// `contact_id` and `label` are set iff `is_match`. `distance` is the
/// minimum distance over the gallery, `+inf` when the gallery is empty.
/// An infinite distance is written as `null` and read back as `+inf`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub contact_id: Option<String>,
    pub label: Option<String>,
    #[serde(with = "distance")]
    pub distance: f32,
    pub is_match: bool,
}

mod distance {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &f32, s: S) -> Result<S::Ok, S::Error> {
        if d.is_finite() {
            s.serialize_some(d)
        } else {
            s.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f32, D::Error> {
        Ok(Option::<f32>::deserialize(d)?.unwrap_or(f32::INFINITY))
    }
}

/// Tagged view of a [`MatchResult`].
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome<'a> {
    Match { contact_id: &'a str, distance: f32 },
    NoMatch { distance: f32 },
}

impl MatchResult {
    fn matched(entry: &GalleryEntry, distance: f32) -> Self {
        Self {
            contact_id: Some(entry.contact_id.clone()),
            label: Some(entry.label.clone()),
            distance,
            is_match: true,
        }
    }

    pub fn no_match(distance: f32) -> Self {
        Self {
            contact_id: None,
            label: None,
            distance,
            is_match: false,
        }
    }

    pub fn outcome(&self) -> MatchOutcome<'_> {
        match (&self.contact_id, self.is_match) {
            (Some(id), true) => MatchOutcome::Match {
                contact_id: id,
                distance: self.distance,
            },
            _ => MatchOutcome::NoMatch {
                distance: self.distance,
            },
        }
    }

    /// Returns the matched contact ID, if any.
    pub fn matched_id(&self) -> Option<&str> {
        if self.is_match { self.contact_id.as_deref() } else { None }
    }
}

/// Finds the nearest gallery entry to `query`.
///
/// The earliest entry wins a tie. The caller must ensure `query` has the
/// gallery's dimension; [`Matcher::find_best`] does that check.
pub fn find_best_match(query: &Embedding, gallery: &Gallery, threshold: f32) -> MatchResult {
    let mut best: Option<(usize, f32)> = None;
    for (i, entry) in gallery.entries().iter().enumerate() {
        let d = query.distance(&entry.embedding);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((i, d)),
        }
    }

    match best {
        Some((i, d)) if d < threshold => MatchResult::matched(&gallery.entries()[i], d),
        Some((_, d)) => MatchResult::no_match(d),
        None => MatchResult::no_match(f32::INFINITY),
    }
}

/// Nearest-neighbor face matcher with a fixed threshold.
///
/// Stateless: safe to share and call concurrently against the same snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    cfg: MatchConfig,
}

impl Matcher {
    pub fn new(cfg: MatchConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    pub fn threshold(&self) -> f32 {
        self.cfg.threshold
    }

    /// Matches `query` against `gallery`.
    ///
    /// Fails only when the query or the gallery does not have the
    /// configured dimension.
    pub fn find_best(
        &self,
        query: &Embedding,
        gallery: &Gallery,
    ) -> Result<MatchResult, FaceIdError> {
        if gallery.dimension() != self.cfg.dimension {
            return Err(FaceIdError::DimensionMismatch {
                expected: self.cfg.dimension,
                got: gallery.dimension(),
            });
        }
        query.ensure_dim(self.cfg.dimension)?;
        Ok(find_best_match(query, gallery, self.cfg.threshold))
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}
