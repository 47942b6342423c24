use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use kanagloss_core::Settings;
use kanagloss_logging::{gloss_debug, gloss_error, gloss_info, gloss_warn};
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("settings store task failed: {0}")]
    Task(String),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Writes whole files by way of a temp file in the same directory and a rename,
/// so a reader never sees half a file.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }

    /// Split `path` into a writer for its directory and its file name.
    pub fn for_path(path: &Path) -> Result<(Self, String), PersistError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PersistError::OutputDir(format!("{} has no file name", path.display())))?
            .to_string();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok((Self::new(dir), filename))
    }
}

/// Where the settings blob lives between runs.
#[async_trait::async_trait]
pub trait SettingsStore: Send + Sync {
    /// The stored blob, or `None` when nothing was ever saved.
    async fn load(&self) -> Result<Option<String>, PersistError>;
    async fn save(&self, blob: &str) -> Result<(), PersistError>;
}

/// Settings kept as one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl SettingsStore for JsonFileStore {
    async fn load(&self) -> Result<Option<String>, PersistError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, blob: &str) -> Result<(), PersistError> {
        let path = self.path.clone();
        let blob = blob.to_string();
        tokio::task::spawn_blocking(move || {
            let (writer, filename) = AtomicFileWriter::for_path(&path)?;
            writer.write(&filename, &blob).map(|_| ())
        })
        .await
        .map_err(|err| PersistError::Task(err.to_string()))?
    }
}

/// Load settings, falling back to defaults when the store is empty, broken
/// or holds something unreadable. A blob that sanitizes to something other
/// than what was stored is written back in its normalized form.
pub async fn load_settings(store: &dyn SettingsStore) -> Settings {
    let raw = match store.load().await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            gloss_debug!("No stored settings, using defaults");
            return Settings::default();
        }
        Err(err) => {
            gloss_error!("Failed to load settings: {}", err);
            return Settings::default();
        }
    };
    let stored: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            gloss_warn!("Stored settings are not valid JSON ({}), using defaults", err);
            return Settings::default();
        }
    };

    let settings = Settings::sanitize(&stored);
    let normalized = serde_json::to_value(&settings).unwrap_or(Value::Null);
    if normalized != stored {
        gloss_info!("Migrating stored settings to their normalized form");
        save_settings(store, &settings).await;
    }
    settings
}

/// Best-effort save. Failures are logged and not retried.
pub async fn save_settings(store: &dyn SettingsStore, settings: &Settings) {
    if let Err(err) = store.save(&settings.to_json()).await {
        gloss_error!("Failed to save settings: {}", err);
    }
}
