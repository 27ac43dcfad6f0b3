//! Remembering which documents have been shared.
//!
//! Records are keyed by the document's path inside the vault, normalized so
//! every spelling of a path finds the same record. Two backends
//! are available, a single JSON file ([`JsonCache`]) and a directory with one
//! file per document ([`FsCache`]). They behave identically.

mod fs;
mod json;
mod record;

pub use fs::FsCache;
pub use json::JsonCache;
pub use record::ShareRecord;

use crate::Settings;
use async_trait::async_trait;
use std::{
    fmt::{self, Debug, Formatter},
    io,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

/// The file [`open()`] uses for the [`JsonCache`], relative to the data
/// directory.
pub const JSON_CACHE_FILE: &str = "share-cache.json";
/// The directory [`open()`] uses for the [`FsCache`], relative to the data
/// directory.
pub const FS_CACHE_DIR: &str = "share-cache";

/// Persistent storage for [`ShareRecord`]s.
///
/// Every mutation is atomic with respect to other mutations on the same
/// cache, so an update can't be lost when a rename races with a share
/// completing.
#[async_trait]
pub trait ShareCache: Send + Sync {
    async fn has(&self, path: &str) -> Result<bool, CacheError>;

    async fn get(&self, path: &str) -> Result<Option<ShareRecord>, CacheError>;

    /// Store a record, or update the existing one.
    ///
    /// Returns whatever is stored for `path` afterwards. Updating a path with
    /// no record does nothing.
    async fn set(
        &self,
        path: &str,
        update: CacheUpdate,
    ) -> Result<Option<ShareRecord>, CacheError>;

    /// Move a record to a new path, replacing anything already there.
    ///
    /// Returns `false` if there was nothing at `old_path`.
    async fn rename(
        &self,
        old_path: &str,
        new_path: &str,
    ) -> Result<bool, CacheError>;

    /// Every record in the cache, sorted by path.
    async fn entries(&self) -> Result<Vec<(String, ShareRecord)>, CacheError>;

    /// The source document was deleted, but we still want to be able to
    /// unshare it.
    async fn mark_deleted_from_vault(
        &self,
        path: &str,
    ) -> Result<bool, CacheError> {
        let record = self
            .set(
                path,
                CacheUpdate::modify(|record| ShareRecord {
                    deleted_from_vault: true,
                    ..record
                }),
            )
            .await?;

        Ok(record.map_or(false, |r| r.deleted_from_vault))
    }

    /// The server confirmed the note is gone.
    async fn mark_deleted_from_server(
        &self,
        path: &str,
    ) -> Result<bool, CacheError> {
        let record = self
            .set(
                path,
                CacheUpdate::modify(|record| ShareRecord {
                    deleted_from_server: true,
                    ..record
                }),
            )
            .await?;

        Ok(record.map_or(false, |r| r.deleted_from_server))
    }
}

/// Open the cache backend selected by the user's [`Settings`].
pub async fn open(
    settings: &Settings,
    data_dir: &Path,
) -> Result<Arc<dyn ShareCache>, CacheError> {
    let cache: Arc<dyn ShareCache> = if settings.use_fs_cache {
        Arc::new(FsCache::open(data_dir.join(FS_CACHE_DIR)).await?)
    } else {
        Arc::new(JsonCache::open(data_dir.join(JSON_CACHE_FILE)).await?)
    };

    Ok(cache)
}

/// How [`ShareCache::set()`] should change a record.
pub enum CacheUpdate {
    /// Store a whole new record (e.g. after re-sharing).
    Replace(ShareRecord),
    /// Derive the new record from the old one.
    Modify(Box<dyn FnOnce(ShareRecord) -> ShareRecord + Send>),
}

impl CacheUpdate {
    pub fn modify<F>(f: F) -> Self
    where
        F: FnOnce(ShareRecord) -> ShareRecord + Send + 'static,
    {
        CacheUpdate::Modify(Box::new(f))
    }

    /// Work out the record to write, if any.
    fn apply(
        self,
        path: &str,
        current: Option<&ShareRecord>,
    ) -> Result<Option<ShareRecord>, CacheError> {
        let modify = match self {
            CacheUpdate::Replace(record) => return Ok(Some(record)),
            CacheUpdate::Modify(modify) => modify,
        };

        let current = match current {
            Some(current) => current,
            None => {
                log::debug!("Nothing cached for \"{}\", skipping update", path);
                return Ok(None);
            },
        };

        if current.deleted_from_server {
            log::warn!(
                "Ignoring an update to \"{}\" because it was already unshared",
                path
            );
            return Ok(None);
        }

        let updated = modify(current.clone());

        if updated.note_id != current.note_id
            || updated.secret_token != current.secret_token
        {
            return Err(CacheError::IdentityChanged {
                path: path.to_string(),
            });
        }

        Ok(Some(updated))
    }
}

impl From<ShareRecord> for CacheUpdate {
    fn from(record: ShareRecord) -> CacheUpdate { CacheUpdate::Replace(record) }
}

impl Debug for CacheUpdate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CacheUpdate::Replace(record) => {
                f.debug_tuple("Replace").field(record).finish()
            },
            CacheUpdate::Modify(_) => {
                f.debug_tuple("Modify").field(&"<function>").finish()
            },
        }
    }
}

/// Errors that can happen while reading or writing the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Unable to access \"{}\"", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Unable to (de)serialize a share record")]
    Serialization(#[from] serde_json::Error),
    #[error("\"{}\" isn't a valid document path", path)]
    InvalidPath { path: String },
    /// An update tried to change a record's note ID or secret token.
    #[error("Refusing to change which note \"{}\" is shared as", path)]
    IdentityChanged { path: String },
}

impl CacheError {
    fn io(path: &Path, source: io::Error) -> Self {
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Turn a document path into the key it is stored under.
///
/// Paths must be relative and stay inside the vault. Spellings of the same
/// path (`a//b.md`, `./a/./b.md`) all map to `a/b.md`.
fn canonical_key(path: &str) -> Result<String, CacheError> {
    let invalid = || CacheError::InvalidPath {
        path: path.to_string(),
    };
    let mut parts = Vec::new();

    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => {
                parts.push(part.to_str().ok_or_else(invalid)?)
            },
            Component::CurDir => {},
            _ => return Err(invalid()),
        }
    }

    if parts.is_empty() {
        return Err(invalid());
    }

    Ok(parts.join("/"))
}

/// Replace a file's contents without ever leaving it half-written.
async fn write_atomically(
    path: &Path,
    contents: &[u8],
) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CacheError::io(parent, e))?;
    }

    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    tokio::fs::write(&temp, contents)
        .await
        .map_err(|e| CacheError::io(&temp, e))?;
    tokio::fs::rename(&temp, path)
        .await
        .map_err(|e| CacheError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record() -> ShareRecord {
        let shared = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

        ShareRecord {
            note_id: String::from("1"),
            secret_token: String::from("tok"),
            view_url: String::from("https://x/n/1#key"),
            shared_datetime: shared,
            updated_datetime: None,
            expire_datetime: shared + chrono::Duration::days(30),
            basename: String::from("a"),
            deleted_from_vault: false,
            deleted_from_server: false,
        }
    }

    #[test]
    fn valid_and_invalid_paths() {
        let inputs = vec![
            ("a.md", true),
            ("folder/sub folder/a.md", true),
            ("", false),
            (".", false),
            ("/etc/passwd", false),
            ("../outside.md", false),
            ("folder/../../outside.md", false),
        ];

        for (path, should_be) in inputs {
            assert_eq!(canonical_key(path).is_ok(), should_be, "{:?}", path);
        }
    }

    #[test]
    fn equivalent_paths_share_a_key() {
        let inputs = vec![
            ("a/b.md", "a/b.md"),
            ("a//b.md", "a/b.md"),
            ("a/./b.md", "a/b.md"),
            ("./a/b.md", "a/b.md"),
            ("a/b.md/", "a/b.md"),
        ];

        for (path, should_be) in inputs {
            assert_eq!(canonical_key(path).unwrap(), should_be, "{:?}", path);
        }
    }

    #[test]
    fn replace_ignores_the_current_record() {
        let mut other = record();
        other.note_id = String::from("2");

        let got = CacheUpdate::from(other.clone())
            .apply("a.md", Some(&record()))
            .unwrap();

        assert_eq!(got, Some(other));
    }

    #[test]
    fn modify_without_a_record_does_nothing() {
        let update = CacheUpdate::modify(|r| ShareRecord {
            deleted_from_vault: true,
            ..r
        });

        let got = update.apply("a.md", None).unwrap();

        assert_eq!(got, None);
    }

    #[test]
    fn unshared_records_are_frozen() {
        let mut current = record();
        current.deleted_from_server = true;
        let update = CacheUpdate::modify(|r| ShareRecord {
            deleted_from_vault: true,
            ..r
        });

        let got = update.apply("a.md", Some(&current)).unwrap();

        assert_eq!(got, None);
    }

    #[test]
    fn modify_cant_change_the_identity() {
        let update = CacheUpdate::modify(|r| ShareRecord {
            secret_token: String::from("stolen"),
            ..r
        });

        let err = update.apply("a.md", Some(&record())).unwrap_err();

        assert!(matches!(err, CacheError::IdentityChanged { .. }));
    }
}
