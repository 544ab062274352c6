//! Local cache of converted paper records.
//!
//! A conversion costs one metadata request plus one request per citation
//! style, so finished records are kept on disk keyed by DOI.
//!
//! # Cache Structure
//!
//! ```text
//! ~/.cache/doi-cite/
//!   records/
//!     <md5 of DOI>.json
//! ```
//!
//! Each cached item is a JSON file containing the record plus metadata.

use crate::config::{default_cache_dir, CacheConfig};
use crate::models::PaperRecord;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Cache metadata stored with each cached item
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheMetadata {
    /// When the item was cached (Unix timestamp)
    cached_at: u64,

    /// When the item expires (Unix timestamp)
    expires_at: u64,

    doi: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedRecord {
    metadata: CacheMetadata,
    record: PaperRecord,
}

/// Result of a cache lookup
#[derive(Debug)]
pub enum CacheResult<T> {
    /// Item was found and is valid
    Hit(T),

    /// Item was not found
    Miss,

    /// Item was found but has expired
    Expired,
}

/// Cache service for storing and retrieving converted records
#[derive(Debug, Clone)]
pub struct CacheService {
    base_dir: PathBuf,
    record_dir: PathBuf,
    config: CacheConfig,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl CacheService {
    /// Create a new cache service with the given config
    pub fn from_config(config: CacheConfig) -> Self {
        let base_dir = config.directory.clone().unwrap_or_else(default_cache_dir);
        let record_dir = base_dir.join("records");

        Self {
            base_dir,
            record_dir,
            config,
        }
    }

    /// Initialize the cache directories
    pub fn initialize(&self) -> std::io::Result<()> {
        if self.config.enabled {
            fs::create_dir_all(&self.record_dir)?;
            tracing::info!("Cache initialized at: {}", self.base_dir.display());
        } else {
            tracing::debug!("Cache is disabled");
        }
        Ok(())
    }

    /// Check if caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record_path(&self, doi: &str) -> PathBuf {
        let digest = md5::compute(doi.as_bytes());
        self.record_dir.join(format!("{:x}.json", digest))
    }

    /// Read a cached record for `doi`
    pub fn get_record(&self, doi: &str) -> CacheResult<PaperRecord> {
        if !self.is_enabled() {
            return CacheResult::Miss;
        }

        match read_cache_file::<CachedRecord>(&self.record_path(doi)) {
            Ok(cached) if cached.metadata.doi != doi => CacheResult::Miss,
            Ok(cached) => {
                if unix_now() >= cached.metadata.expires_at {
                    tracing::debug!("Cache expired for {}", doi);
                    CacheResult::Expired
                } else {
                    tracing::debug!("Cache HIT for {}", doi);
                    CacheResult::Hit(cached.record)
                }
            }
            Err(_) => {
                tracing::debug!("Cache MISS for {}", doi);
                CacheResult::Miss
            }
        }
    }

    /// Cache a converted record under its DOI. Error markers are not cached.
    pub fn set_record(&self, record: &PaperRecord) {
        if !self.is_enabled() || record.is_error() || record.doi.is_empty() {
            return;
        }

        let now = unix_now();
        let cached = CachedRecord {
            metadata: CacheMetadata {
                cached_at: now,
                expires_at: now + self.config.ttl_seconds,
                doi: record.doi.clone(),
            },
            record: record.clone(),
        };

        let path = self.record_path(&record.doi);
        if let Err(e) = fs::create_dir_all(&self.record_dir)
            .and_then(|_| write_cache_file(&path, &cached))
        {
            tracing::warn!("Failed to cache record {}: {}", record.doi, e);
        } else {
            tracing::debug!("Cached record {}", record.doi);
        }
    }

    /// Clear all cached data
    pub fn clear_all(&self) -> std::io::Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let _ = fs::remove_dir_all(&self.base_dir);
        self.initialize()?;
        tracing::info!("Cache cleared");
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        if !self.is_enabled() {
            return CacheStats::disabled();
        }

        let mut record_count = 0;
        let mut size_bytes = 0;
        if let Ok(entries) = self.record_dir.read_dir() {
            for entry in entries.flatten() {
                record_count += 1;
                size_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }

        CacheStats {
            enabled: true,
            cache_dir: self.base_dir.clone(),
            record_count,
            size_kb: size_bytes / 1024,
            ttl: Duration::from_secs(self.config.ttl_seconds),
        }
    }
}

fn read_cache_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, std::io::Error> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
}

fn write_cache_file<T: Serialize>(path: &Path, data: &T) -> Result<(), std::io::Error> {
    let content = serde_json::to_string_pretty(data)?;
    fs::write(path, content)
}

/// Statistics about the cache
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub enabled: bool,
    pub cache_dir: PathBuf,
    pub record_count: usize,
    pub size_kb: u64,
    pub ttl: Duration,
}

impl CacheStats {
    fn disabled() -> Self {
        Self {
            enabled: false,
            cache_dir: PathBuf::new(),
            record_count: 0,
            size_kb: 0,
            ttl: Duration::ZERO,
        }
    }
}
