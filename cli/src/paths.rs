//! Path utilities for facecrm applications.

use std::io;
use std::path::{Path, PathBuf};

/// Default base directory name.
pub const DEFAULT_BASE_DIR: &str = ".facecrm";

/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Contact store filename inside the data directory.
pub const CONTACTS_FILE: &str = "contacts.json";

/// Provides access to the facecrm directory structure.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Application name.
    pub app_name: String,
    /// User's home directory.
    pub home_dir: PathBuf,
}

impl Paths {
    /// Creates a new Paths instance for the given app.
    pub fn new(app_name: impl Into<String>) -> io::Result<Self> {
        let home_dir = dirs::home_dir().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "could not find home directory")
        })?;
        Ok(Self::with_home(app_name, home_dir))
    }

    /// Creates a Paths instance rooted at an explicit home directory.
    pub fn with_home(app_name: impl Into<String>, home_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_name: app_name.into(),
            home_dir: home_dir.into(),
        }
    }

    /// Returns the base directory (~/.facecrm).
    pub fn base_dir(&self) -> PathBuf {
        self.home_dir.join(DEFAULT_BASE_DIR)
    }

    /// Returns the app-specific directory (~/.facecrm/<app>).
    pub fn app_dir(&self) -> PathBuf {
        self.base_dir().join(&self.app_name)
    }

    /// Returns the config file path (~/.facecrm/<app>/config.yaml).
    pub fn config_file(&self) -> PathBuf {
        self.app_dir().join(DEFAULT_CONFIG_FILE)
    }

    /// Returns the data directory (~/.facecrm/<app>/data).
    pub fn data_dir(&self) -> PathBuf {
        self.app_dir().join("data")
    }
}

/// Contact store layout under a data directory.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the contacts file (<root>/contacts.json).
    pub fn contacts_file(&self) -> PathBuf {
        self.root.join(CONTACTS_FILE)
    }

    /// Returns the photo directory (<root>/images).
    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    /// Returns the photo path for a contact.
    pub fn image_path(&self, contact_id: &str, extension: &str) -> PathBuf {
        self.images_dir().join(format!("{contact_id}.{extension}"))
    }

    /// Creates the root and photo directories if they don't exist.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.images_dir())
    }
}
