use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::{Contact, Interaction, NewContact, NewInteraction, RepositoryError};

/// Persists contacts, their photos and logged interactions.
///
/// `create` stores image, fields and embedding as one logical unit: it
/// either returns the complete contact or an error with nothing written.
///
/// Implementations must be safe for concurrent use (Send + Sync).
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Returns all contacts in insertion order.
    async fn list(&self) -> Result<Vec<Contact>, RepositoryError>;

    async fn get(&self, id: &str) -> Result<Option<Contact>, RepositoryError>;

    async fn create(&self, new: NewContact) -> Result<Contact, RepositoryError>;

    async fn touch_last_seen(&self, id: &str, at: DateTime<Utc>) -> Result<(), RepositoryError>;

    /// Removes a contact and its interactions. No error if the ID does not exist.
    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;

    /// Case-insensitive search over name, company and title.
    async fn search(&self, query: &str) -> Result<Vec<Contact>, RepositoryError> {
        let all = self.list().await?;
        Ok(all.into_iter().filter(|c| c.matches_query(query)).collect())
    }

    async fn add_interaction(&self, new: NewInteraction) -> Result<Interaction, RepositoryError>;

    /// Returns a contact's interactions, newest first.
    async fn interactions_for(&self, contact_id: &str) -> Result<Vec<Interaction>, RepositoryError>;
}

/// In-memory [`ContactRepository`] implementation.
/// Data is lost on restart. Photos are kept inline as data URLs.
pub struct MemoryRepository {
    inner: Mutex<MemoryRepositoryInner>,
}

#[derive(Default)]
struct MemoryRepositoryInner {
    contacts: Vec<Contact>,
    interactions: Vec<Interaction>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryRepositoryInner::default()),
        }
    }

    /// Creates a repository pre-populated with stored contacts.
    pub fn with_contacts(contacts: Vec<Contact>) -> Self {
        Self {
            inner: Mutex::new(MemoryRepositoryInner {
                contacts,
                interactions: Vec::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContactRepository for MemoryRepository {
    async fn list(&self) -> Result<Vec<Contact>, RepositoryError> {
        Ok(self.inner.lock().contacts.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Contact>, RepositoryError> {
        Ok(self.inner.lock().contacts.iter().find(|c| c.id == id).cloned())
    }

    async fn create(&self, new: NewContact) -> Result<Contact, RepositoryError> {
        let contact = Contact::from_new(
            &new,
            Uuid::new_v4().to_string(),
            new.image.to_data_url(),
            Utc::now(),
        );
        self.inner.lock().contacts.push(contact.clone());
        Ok(contact)
    }

    async fn touch_last_seen(&self, id: &str, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock();
        let contact = inner
            .contacts
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        contact.last_seen = Some(at);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock();
        inner.contacts.retain(|c| c.id != id);
        inner.interactions.retain(|i| i.contact_id != id);
        Ok(())
    }

    async fn add_interaction(&self, new: NewInteraction) -> Result<Interaction, RepositoryError> {
        let mut inner = self.inner.lock();
        if !inner.contacts.iter().any(|c| c.id == new.contact_id) {
            return Err(RepositoryError::NotFound(new.contact_id));
        }
        let interaction = Interaction {
            id: Uuid::new_v4().to_string(),
            contact_id: new.contact_id,
            date: Utc::now(),
            notes: new.notes,
            location: new.location,
        };
        inner.interactions.push(interaction.clone());
        Ok(interaction)
    }

    async fn interactions_for(
        &self,
        contact_id: &str,
    ) -> Result<Vec<Interaction>, RepositoryError> {
        let inner = self.inner.lock();
        let mut found: Vec<Interaction> = inner
            .interactions
            .iter()
            .filter(|i| i.contact_id == contact_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(found)
    }
}
