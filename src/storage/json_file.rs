//! Collection stored as one JSON document.
//!
//! # Layout
//!
//! ```text
//! <data_dir>/
//!   projects.json
//!   backups/
//!     backup_20240131_093000.json
//! ```
//!
//! Saves go to a temporary file that is then renamed over `projects.json`.
//! Before each save the previous document is copied into `backups/`, keeping
//! the newest `max_backups` copies. A document that fails to load is replaced
//! by the newest backup, or by a fresh collection when no backup loads.

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::{CollectionStore, LibraryData, StoreError};
use crate::config::StorageConfig;
use crate::models::now_rfc3339;

/// File name of the collection inside the data directory
pub const DATABASE_FILE: &str = "projects.json";

const BACKUP_DIR: &str = "backups";

/// File-backed [`CollectionStore`]
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    backup_dir: PathBuf,
    max_backups: usize,
    auto_backup: bool,
    data: LibraryData,
}

impl JsonFileStore {
    /// Open (or start) the collection under `config.data_dir`
    pub fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        let path = config.data_dir.join(DATABASE_FILE);
        let backup_dir = config.data_dir.join(BACKUP_DIR);
        fs::create_dir_all(&config.data_dir)?;
        fs::create_dir_all(&backup_dir)?;

        let data = load_or_recover(&path, &backup_dir);
        tracing::info!("Collection opened at {}", path.display());

        Ok(Self {
            path,
            backup_dir,
            max_backups: config.max_backups,
            auto_backup: config.auto_backup,
            data,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Backup files, newest first
    pub fn backups(&self) -> Vec<PathBuf> {
        list_backups(&self.backup_dir)
    }

    /// Copy the current document into the backup directory and prune old
    /// backups. Does nothing before the first save.
    pub fn create_backup(&self) -> Result<Option<PathBuf>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let backup = self.backup_dir.join(format!("backup_{}.json", timestamp));
        fs::copy(&self.path, &backup)?;
        tracing::debug!("Backup created: {}", backup.display());

        self.prune_backups();
        Ok(Some(backup))
    }

    fn prune_backups(&self) {
        for old in list_backups(&self.backup_dir)
            .into_iter()
            .skip(self.max_backups)
        {
            if let Err(e) = fs::remove_file(&old) {
                tracing::warn!("Failed to remove old backup {}: {}", old.display(), e);
            }
        }
    }

    fn write_atomically(&self) -> Result<(), StoreError> {
        let temp = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&self.data)?;

        let result = fs::write(&temp, content).and_then(|_| fs::rename(&temp, &self.path));
        if result.is_err() {
            let _ = fs::remove_file(&temp);
        }
        result.map_err(StoreError::from)
    }
}

impl CollectionStore for JsonFileStore {
    fn data(&self) -> &LibraryData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut LibraryData {
        &mut self.data
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        if self.auto_backup {
            // a failed backup must not block the save itself
            if let Err(e) = self.create_backup() {
                tracing::warn!("Backup failed: {}", e);
            }
        }

        self.data.last_modified = now_rfc3339();
        self.write_atomically()?;
        tracing::debug!("Collection saved to {}", self.path.display());
        Ok(())
    }
}

fn read_data(path: &Path) -> Result<LibraryData, StoreError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn load_or_recover(path: &Path, backup_dir: &Path) -> LibraryData {
    if !path.exists() {
        tracing::info!("No collection at {}, starting fresh", path.display());
        return LibraryData::default();
    }

    match read_data(path) {
        Ok(data) => data,
        Err(e) => {
            tracing::error!("Failed to load {}: {}", path.display(), e);
            restore_from_backup(backup_dir).unwrap_or_default()
        }
    }
}

fn restore_from_backup(backup_dir: &Path) -> Option<LibraryData> {
    let Some(latest) = list_backups(backup_dir).into_iter().next() else {
        tracing::warn!("No backup files found");
        return None;
    };

    match read_data(&latest) {
        Ok(data) => {
            tracing::info!("Restored collection from {}", latest.display());
            Some(data)
        }
        Err(e) => {
            tracing::error!("Failed to restore from {}: {}", latest.display(), e);
            None
        }
    }
}

/// `backup_*.json` files, newest modification time first
fn list_backups(backup_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(backup_dir) else {
        return Vec::new();
    };

    let mut backups: Vec<(SystemTime, PathBuf)> = entries
        .flatten()
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with("backup_") && name.ends_with(".json")
        })
        .map(|entry| {
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.path())
        })
        .collect();

    // newest first; names embed the timestamp and break mtime ties
    backups.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    backups.into_iter().map(|(_, path)| path).collect()
}
