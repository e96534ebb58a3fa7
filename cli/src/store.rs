//! File-backed contact store.
//!
//! Layout under the data directory:
//!
//! ```text
//! contacts.json       contacts and interactions
//! images/<id>.<ext>   enrollment photos
//! ```
//!
//! Every write rewrites `contacts.json` through a temporary file and a
//! rename, so a failed write leaves the previous file intact.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use facecrm_faceid::{
    Contact, ContactRepository, Interaction, NewContact, NewInteraction, RepositoryError,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::paths::StoreLayout;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    contacts: Vec<Contact>,
    #[serde(default)]
    interactions: Vec<Interaction>,
}

/// [`ContactRepository`] persisted as a JSON document plus photo files.
///
/// One process owns the store; operations within it are serialized.
pub struct JsonFileRepository {
    layout: StoreLayout,
    lock: Mutex<()>,
}

impl JsonFileRepository {
    /// Opens (and creates if needed) a store rooted at `layout`.
    pub async fn open(layout: StoreLayout) -> Result<Self, RepositoryError> {
        tokio::fs::create_dir_all(layout.images_dir())
            .await
            .map_err(storage)?;
        debug!(root = %layout.root().display(), "contact store opened");
        Ok(Self {
            layout,
            lock: Mutex::new(()),
        })
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    async fn load(&self) -> Result<StoreFile, RepositoryError> {
        match tokio::fs::read(self.layout.contacts_file()).await {
            Ok(data) if data.is_empty() => Ok(StoreFile::default()),
            Ok(data) => serde_json::from_slice(&data).map_err(storage),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoreFile::default()),
            Err(e) => Err(storage(e)),
        }
    }

    async fn save(&self, file: &StoreFile) -> Result<(), RepositoryError> {
        let data = serde_json::to_vec_pretty(file).map_err(storage)?;
        let target = self.layout.contacts_file();
        let tmp = target.with_extension("json.tmp");
        tokio::fs::write(&tmp, &data).await.map_err(storage)?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(storage(e));
        }
        Ok(())
    }
}

fn storage(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove photo");
        }
    }
}

#[async_trait]
impl ContactRepository for JsonFileRepository {
    async fn list(&self) -> Result<Vec<Contact>, RepositoryError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.contacts)
    }

    async fn get(&self, id: &str) -> Result<Option<Contact>, RepositoryError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.contacts.into_iter().find(|c| c.id == id))
    }

    async fn create(&self, new: NewContact) -> Result<Contact, RepositoryError> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;

        let id = Uuid::new_v4().to_string();
        let image_path = self.layout.image_path(&id, new.image.extension());
        tokio::fs::write(&image_path, &new.image.data)
            .await
            .map_err(storage)?;

        let contact = Contact::from_new(
            &new,
            id,
            image_path.to_string_lossy().into_owned(),
            Utc::now(),
        );
        file.contacts.push(contact.clone());
        if let Err(e) = self.save(&file).await {
            remove_quietly(&image_path).await;
            return Err(e);
        }
        debug!(contact_id = %contact.id, "contact stored");
        Ok(contact)
    }

    async fn touch_last_seen(&self, id: &str, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        let contact = file
            .contacts
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        contact.last_seen = Some(at);
        self.save(&file).await
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        let Some(pos) = file.contacts.iter().position(|c| c.id == id) else {
            return Ok(());
        };
        let removed = file.contacts.remove(pos);
        file.interactions.retain(|i| i.contact_id != id);
        self.save(&file).await?;

        let image = Path::new(&removed.image_ref);
        if image.starts_with(self.layout.images_dir()) {
            remove_quietly(image).await;
        }
        Ok(())
    }

    async fn add_interaction(&self, new: NewInteraction) -> Result<Interaction, RepositoryError> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        if !file.contacts.iter().any(|c| c.id == new.contact_id) {
            return Err(RepositoryError::NotFound(new.contact_id));
        }
        let interaction = Interaction {
            id: Uuid::new_v4().to_string(),
            contact_id: new.contact_id,
            date: Utc::now(),
            notes: new.notes,
            location: new.location,
        };
        file.interactions.push(interaction.clone());
        self.save(&file).await?;
        Ok(interaction)
    }

    async fn interactions_for(
        &self,
        contact_id: &str,
    ) -> Result<Vec<Interaction>, RepositoryError> {
        let _guard = self.lock.lock().await;
        let mut found: Vec<Interaction> = self
            .load()
            .await?
            .interactions
            .into_iter()
            .filter(|i| i.contact_id == contact_id)
            .collect();
        found.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(found)
    }
}
