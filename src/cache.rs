//! Cache storage module
//!
//! This module provides persistent caching functionality using the system's
//! standard cache directory. Data is serialized to JSON format for storage and
//! entries older than the configured time-to-live are treated as missing.

use serde::{Deserialize, Serialize};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to determine cache directory location
    #[error("Failed to determine cache directory location")]
    CacheDirectoryNotFound,

    /// Failed to create or access cache directory
    #[error("Failed to create cache directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read cached data
    #[error("Failed to read cache file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write cached data
    #[error("Failed to write cache file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to deserialize cached data
    #[error("Failed to deserialize cache file {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize data for caching
    #[error("Failed to serialize data: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// A generic cache storage for serializable data
///
/// Data is stored as one JSON file per identifier.
pub struct CacheStorage<T> {
    /// The directory where cached data is stored
    cache_dir: PathBuf,
    /// Entries older than this are ignored (None keeps them forever)
    ttl: Option<Duration>,
    _phantom: PhantomData<T>,
}

impl<T> CacheStorage<T>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    /// Opens or creates a cache storage with the given name
    ///
    /// The cache lives in the system's standard cache directory under a
    /// subdirectory named after the sanitized `name`.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let cache: CacheStorage<MediaDetails> =
    ///     CacheStorage::open("metadata", Some(Duration::from_secs(24 * 60 * 60)))?;
    /// ```
    pub fn open(name: &str, ttl: Option<Duration>) -> Result<Self, CacheError> {
        let proj_dirs = directories::ProjectDirs::from("", "", "stream-scout")
            .ok_or(CacheError::CacheDirectoryNotFound)?;

        Self::open_in(&proj_dirs.cache_dir().join(sanitize_name(name)), ttl)
    }

    /// Opens a cache rooted at an explicit directory
    pub fn open_in(cache_dir: &Path, ttl: Option<Duration>) -> Result<Self, CacheError> {
        fs::create_dir_all(cache_dir).map_err(|e| CacheError::DirectoryCreationFailed {
            path: cache_dir.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            cache_dir: cache_dir.to_path_buf(),
            ttl,
            _phantom: PhantomData,
        })
    }

    /// Loads cached data for the given identifier
    ///
    /// Returns `None` if nothing is cached or the entry has expired. Returns an
    /// error if the entry exists but cannot be read or deserialized.
    pub fn load(&self, identifier: &str) -> Result<Option<T>, CacheError> {
        let file_path = self.entry_path(identifier);

        if !file_path.exists() || self.is_expired(&file_path) {
            return Ok(None);
        }

        let content = fs::read_to_string(&file_path).map_err(|e| CacheError::ReadFailed {
            path: file_path.clone(),
            source: e,
        })?;

        let data =
            serde_json::from_str(&content).map_err(|e| CacheError::DeserializationFailed {
                path: file_path,
                source: e,
            })?;

        Ok(Some(data))
    }

    /// Stores data in the cache with the given identifier
    pub fn store(&self, identifier: &str, data: &T) -> Result<(), CacheError> {
        let file_path = self.entry_path(identifier);
        let content = serde_json::to_string_pretty(data)?;

        fs::write(&file_path, content).map_err(|e| CacheError::WriteFailed {
            path: file_path,
            source: e,
        })?;

        Ok(())
    }

    /// Returns the path to the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn entry_path(&self, identifier: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.json", encode_key(identifier)))
    }

    fn is_expired(&self, file_path: &Path) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };

        // Unreadable timestamps count as expired so the entry gets refreshed
        fs::metadata(file_path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_none_or(|age| age > ttl)
    }
}

/// Sanitizes a name for use in file paths
///
/// Converts to lowercase and replaces all characters that are not
/// a-z, 0-9, or hyphen with underscores.
/// File name for an entry key
///
/// Lowercase letters, digits and `-` are kept; every other byte becomes `_`
/// followed by two hex digits. Distinct keys always map to distinct names,
/// also on case-insensitive filesystems.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("_{byte:02x}"));
        }
    }
    encoded
}

fn sanitize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Simple"), "simple");
        assert_eq!(sanitize_name("movie:42"), "movie_42");
        assert_eq!(sanitize_name("With-Hyphens"), "with-hyphens");
        assert_eq!(sanitize_name("Special!@#$%"), "special_____");
    }

    #[test]
    fn test_encode_key() {
        assert_eq!(encode_key("tv_7"), "tv_5f7");
        assert_eq!(encode_key("movie:42"), "movie_3a42");
        assert_eq!(encode_key("Abc"), "_41bc");
        assert_ne!(encode_key("movie_1.5"), encode_key("movie_1_5"));
        assert_ne!(encode_key("a_2e"), encode_key("a."));
    }

    #[test]
    fn test_similar_keys_do_not_share_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache: CacheStorage<String> = CacheStorage::open_in(dir.path(), None).unwrap();

        cache.store("movie_1.5", &"dotted".to_string()).unwrap();
        cache.store("movie_1_5", &"underscored".to_string()).unwrap();
        cache.store("Movie_1_5", &"capitalized".to_string()).unwrap();

        assert_eq!(cache.load("movie_1.5").unwrap().as_deref(), Some("dotted"));
        assert_eq!(cache.load("movie_1_5").unwrap().as_deref(), Some("underscored"));
        assert_eq!(cache.load("Movie_1_5").unwrap().as_deref(), Some("capitalized"));
    }

    #[test]
    fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache: CacheStorage<Vec<String>> = CacheStorage::open_in(dir.path(), None).unwrap();

        assert!(cache.load("tv:7").unwrap().is_none());
        cache.store("tv:7", &vec!["Pilot".to_string()]).unwrap();
        assert_eq!(cache.load("tv:7").unwrap(), Some(vec!["Pilot".to_string()]));
    }

    #[test]
    fn test_zero_ttl_expires_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache: CacheStorage<u32> =
            CacheStorage::open_in(dir.path(), Some(Duration::ZERO)).unwrap();

        cache.store("answer", &42).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.load("answer").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_entry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache: CacheStorage<u32> = CacheStorage::open_in(dir.path(), None).unwrap();

        fs::write(dir.path().join("broken.json"), "not json").unwrap();
        assert!(matches!(
            cache.load("broken"),
            Err(CacheError::DeserializationFailed { .. })
        ));
    }
}
