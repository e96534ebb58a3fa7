use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{Contact, ContactRepository, Embedding, FaceIdError, RepositoryError};

/// One enrolled face available for matching.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryEntry {
    pub contact_id: String,
    pub label: String,
    pub embedding: Embedding,
}

/// An immutable, ordered snapshot of enrolled faces.
///
/// Every entry has exactly [`Gallery::dimension`] components. Order is
/// repository insertion order and decides matcher tie-breaks.
#[derive(Debug, Clone)]
pub struct Gallery {
    dimension: usize,
    entries: Arc<[GalleryEntry]>,
}

impl Gallery {
    pub fn empty(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Arc::from(Vec::new()),
        }
    }

    /// Creates a gallery, rejecting any entry of the wrong dimension.
    pub fn new(entries: Vec<GalleryEntry>, dimension: usize) -> Result<Self, FaceIdError> {
        for e in &entries {
            e.embedding.ensure_dim(dimension)?;
        }
        Ok(Self {
            dimension,
            entries: entries.into(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, contact_id: &str) -> Option<&GalleryEntry> {
        self.entries.iter().find(|e| e.contact_id == contact_id)
    }
}

/// Projects stored contacts into a gallery.
///
/// Contacts without an embedding, or whose embedding has the wrong
/// dimension or non-finite components, are skipped.
pub fn build_gallery(contacts: &[Contact], dimension: usize) -> Gallery {
    let mut entries = Vec::with_capacity(contacts.len());
    for c in contacts {
        let Some(raw) = &c.embedding else {
            warn!(contact_id = %c.id, "skipping contact without embedding");
            continue;
        };
        match Embedding::new(raw.clone(), dimension) {
            Ok(embedding) => entries.push(GalleryEntry {
                contact_id: c.id.clone(),
                label: c.name.clone(),
                embedding,
            }),
            Err(e) => warn!(
                contact_id = %c.id,
                error = %e,
                "skipping contact with invalid embedding"
            ),
        }
    }
    Gallery {
        dimension,
        entries: entries.into(),
    }
}

/// Holds the current gallery snapshot of one recognizer.
///
/// Readers get an `Arc` to a complete snapshot; [`GalleryHandle::replace`]
/// swaps the pointer, so a reader never sees a half-updated list.
pub struct GalleryHandle {
    current: RwLock<Arc<Gallery>>,
}

impl GalleryHandle {
    pub fn new(gallery: Gallery) -> Self {
        Self {
            current: RwLock::new(Arc::new(gallery)),
        }
    }

    pub fn snapshot(&self) -> Arc<Gallery> {
        self.current.read().clone()
    }

    pub fn replace(&self, gallery: Gallery) {
        *self.current.write() = Arc::new(gallery);
    }

    /// Re-reads every contact from the repository and swaps in a new
    /// snapshot. On error the previous snapshot stays in place.
    pub async fn refresh(
        &self,
        repo: &dyn ContactRepository,
    ) -> Result<Arc<Gallery>, RepositoryError> {
        let dimension = self.snapshot().dimension();
        let contacts = repo.list().await?;
        let gallery = Arc::new(build_gallery(&contacts, dimension));
        debug!(
            contacts = contacts.len(),
            entries = gallery.len(),
            "gallery refreshed"
        );
        *self.current.write() = gallery.clone();
        Ok(gallery)
    }
}
