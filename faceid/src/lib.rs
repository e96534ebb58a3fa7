//! Face embedding matching, contact gallery and enrollment.
//!
//! # Architecture
//!
//! ```text
//! image --FaceExtractor--> Detection(s) --Matcher + Gallery--> MatchResult
//! image + ContactFields --Enroller--> ContactRepository::create
//! ```
//!
//! - [`FaceExtractor`]: opaque model turning an image into embeddings.
//!   [`LazyExtractor`] owns a model that is loaded once on
//!   [`LazyExtractor::ensure_loaded`].
//! - [`Gallery`]: immutable snapshot of enrolled embeddings, built from
//!   stored contacts with [`build_gallery`] and swapped atomically through
//!   a [`GalleryHandle`].
//! - [`Matcher`]: nearest neighbor by Euclidean distance; a match needs a
//!   distance strictly below the threshold (default 0.6).
//! - [`Enroller`]: capture, extract, validate and persist a new contact.
//!
//! # Usage
//!
//! ```
//! use facecrm_faceid::{Embedding, Gallery, GalleryEntry, MatchConfig, Matcher};
//!
//! let e1 = Embedding::new(vec![0.0; 128], 128).unwrap();
//! let gallery = Gallery::new(
//!     vec![GalleryEntry { contact_id: "A".into(), label: "Ada".into(), embedding: e1.clone() }],
//!     128,
//! )
//! .unwrap();
//!
//! let result = Matcher::new(MatchConfig::default()).find_best(&e1, &gallery).unwrap();
//! assert!(result.is_match);
//! assert_eq!(result.contact_id.as_deref(), Some("A"));
//! ```

mod contact;
mod detection;
mod embedding;
mod enroll;
mod error;
mod extractor;
mod gallery;
mod image;
mod matcher;
mod repository;

pub use contact::{Contact, ContactFields, Interaction, NewContact, NewInteraction};
pub use detection::{BoundingBox, Detection, FaceDetection};
pub use embedding::{DEFAULT_DIMENSION, Embedding, euclidean_distance};
pub use enroll::{CapturedFace, Enroller};
pub use error::{EnrollmentError, FaceIdError, FieldError, RepositoryError};
pub use extractor::{FaceExtractor, LazyExtractor, ModelLoader};
pub use gallery::{Gallery, GalleryEntry, GalleryHandle, build_gallery};
pub use image::ImageBuffer;
pub use matcher::{
    DEFAULT_THRESHOLD, MatchConfig, MatchOutcome, MatchResult, Matcher, find_best_match,
};
pub use repository::{ContactRepository, MemoryRepository};
