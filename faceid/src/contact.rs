use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Embedding, FieldError, ImageBuffer};

/// An enrolled person, as stored by the repository.
///
/// `embedding` is the raw stored vector. It is validated against the
/// extractor dimension when the gallery is built, never trusted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub company: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub linkedin_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default)]
    pub embedding: Option<Vec<f32>>,

    /// Where the enrollment photo lives (URL, path or data URL).
    #[serde(default)]
    pub image_ref: String,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

impl Contact {
    /// Builds a stored contact from a validated enrollment.
    pub fn from_new(
        new: &NewContact,
        id: impl Into<String>,
        image_ref: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: new.name.clone(),
            company: new.company.clone(),
            title: new.title.clone(),
            linkedin_url: new.linkedin_url.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            notes: new.notes.clone(),
            tags: new.tags.clone(),
            embedding: Some(new.embedding.to_vec()),
            image_ref: image_ref.into(),
            created_at,
            last_seen: None,
        }
    }

    /// Case-insensitive substring match over name, company and title.
    /// An empty query matches everything.
    pub fn matches_query(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&q)
            || self.company.to_lowercase().contains(&q)
            || self.title.to_lowercase().contains(&q)
    }
}

/// A validated enrollment, ready to be persisted as one unit.
#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub company: String,
    pub title: String,
    pub linkedin_url: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub embedding: Embedding,
    pub image: ImageBuffer,
}

/// Raw enrollment form input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactFields {
    pub name: String,
    pub company: String,
    pub title: String,
    pub linkedin_url: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
    /// Comma-separated, e.g. "colleague, conference".
    pub tags: String,
}

impl ContactFields {
    /// Returns every field problem at once; empty when the form is valid.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "is required"));
        }
        if self.company.trim().is_empty() {
            errors.push(FieldError::new("company", "is required"));
        }

        let linkedin = self.linkedin_url.trim();
        if !linkedin.is_empty() {
            match Url::parse(linkedin) {
                Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
                Ok(_) => errors.push(FieldError::new("linkedin_url", "must be an http(s) URL")),
                Err(e) => errors.push(FieldError::new("linkedin_url", e.to_string())),
            }
        }

        let email = self.email.trim();
        if !email.is_empty() && !looks_like_email(email) {
            errors.push(FieldError::new("email", "is not a valid address"));
        }
        errors
    }

    /// Splits the tag list on commas, trimming and dropping empties.
    pub fn parse_tags(&self) -> Vec<String> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    }

    pub(crate) fn into_new_contact(self, embedding: Embedding, image: ImageBuffer) -> NewContact {
        let tags = self.parse_tags();
        NewContact {
            name: self.name.trim().to_string(),
            company: self.company.trim().to_string(),
            title: self.title.trim().to_string(),
            linkedin_url: self.linkedin_url.trim().to_string(),
            email: non_blank(self.email),
            phone: non_blank(self.phone),
            notes: non_blank(self.notes),
            tags,
            embedding,
            image,
        }
    }
}

fn non_blank(s: String) -> Option<String> {
    let t = s.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

fn looks_like_email(s: &str) -> bool {
    let mut parts = s.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !s.contains(char::is_whitespace)
        }
        _ => false,
    }
}

/// A logged meeting with a contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub contact_id: String,
    pub date: DateTime<Utc>,

    #[serde(default)]
    pub notes: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Input for [`crate::ContactRepository::add_interaction`].
#[derive(Debug, Clone, Default)]
pub struct NewInteraction {
    pub contact_id: String,
    pub notes: String,
    pub location: Option<String>,
}
