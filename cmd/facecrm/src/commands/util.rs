//! Utility functions for CLI commands.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use facecrm_cli::{Config, JsonFileRepository, Output, OutputFormat, load_config};
use facecrm_faceid::{Contact, ImageBuffer};
use serde::Serialize;

use crate::Cli;

const APP_NAME: &str = "facecrm";

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    load_config(APP_NAME, cli.config.as_deref())
}

/// Opens the contact store the configuration points at.
pub async fn open_store(cfg: &Config) -> anyhow::Result<Arc<JsonFileRepository>> {
    let layout = cfg.store_layout()?;
    Ok(Arc::new(JsonFileRepository::open(layout).await?))
}

/// Builds the output writer from global flags.
pub fn output(cli: &Cli) -> Output {
    Output::new(OutputFormat::from_json_flag(cli.json), cli.output.clone())
}

/// Reads a photo from disk, guessing the mime type from its extension.
pub async fn load_image(path: &str) -> anyhow::Result<ImageBuffer> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read image {}: {}", path, e))?;
    Ok(ImageBuffer::new(mime_for_path(Path::new(path)), data))
}

fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Contact as shown to the user, without the embedding.
#[derive(Serialize)]
pub struct ContactView {
    pub id: String,
    pub name: String,
    pub company: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub linkedin_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub photo: String,
    pub enrolled: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

impl From<&Contact> for ContactView {
    fn from(c: &Contact) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            company: c.company.clone(),
            title: c.title.clone(),
            linkedin_url: c.linkedin_url.clone(),
            email: c.email.clone(),
            phone: c.phone.clone(),
            notes: c.notes.clone(),
            tags: c.tags.clone(),
            photo: c.image_ref.clone(),
            enrolled: c.embedding.is_some(),
            created_at: c.created_at,
            last_seen: c.last_seen,
        }
    }
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Prints error message.
pub fn print_error(msg: &str) {
    eprintln!("\x1b[31m✗\x1b[0m {}", msg);
}

/// Prints info message.
pub fn print_info(msg: &str) {
    eprintln!("\x1b[34mℹ\x1b[0m {}", msg);
}

/// Prints warning message.
pub fn print_warning(msg: &str) {
    eprintln!("\x1b[33m⚠\x1b[0m {}", msg);
}
