use super::{
    canonical_key, write_atomically, CacheError, CacheUpdate, ShareCache,
    ShareRecord,
};
use async_trait::async_trait;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::{fs, sync::Mutex};

const EXTENSION: &str = ".json";

/// A cache which stores each record in its own file, laid out like the vault
/// itself (`notes/todo.md` lives at `<root>/notes/todo.md.json`).
#[derive(Debug)]
pub struct FsCache {
    root: PathBuf,
    /// Held for the whole read-modify-write of a mutation.
    lock: Mutex<()>,
}

impl FsCache {
    pub async fn open<P: Into<PathBuf>>(root: P) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| CacheError::io(&root, e))?;

        log::debug!("Using the share records in {}", root.display());

        Ok(FsCache {
            root,
            lock: Mutex::new(()),
        })
    }

    /// Where the record for a canonical key lives.
    fn record_file(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}{}", key, EXTENSION))
    }

    /// Map a record file back to the document path it belongs to.
    fn document_path(&self, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(&self.root).ok()?;
        let components: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;

        let joined = components.join("/");

        joined
            .strip_suffix(EXTENSION)
            .filter(|path| !path.is_empty())
            .map(String::from)
    }

    async fn read(&self, file: &Path) -> Result<Option<ShareRecord>, CacheError> {
        match fs::read(file).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io(file, e)),
        }
    }

    /// Clean up directories left empty after a record moved out of them.
    async fn prune_empty_parents(&self, file: &Path) {
        let mut dir = file.parent();

        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            // fails (and stops us) as soon as a directory isn't empty
            if fs::remove_dir(current).await.is_err() {
                break;
            }
            dir = current.parent();
        }
    }
}

#[async_trait]
impl ShareCache for FsCache {
    async fn has(&self, path: &str) -> Result<bool, CacheError> {
        let file = self.record_file(&canonical_key(path)?);

        match fs::metadata(&file).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(&file, e)),
        }
    }

    async fn get(&self, path: &str) -> Result<Option<ShareRecord>, CacheError> {
        let file = self.record_file(&canonical_key(path)?);
        self.read(&file).await
    }

    async fn set(
        &self,
        path: &str,
        update: CacheUpdate,
    ) -> Result<Option<ShareRecord>, CacheError> {
        let key = canonical_key(path)?;
        let _guard = self.lock.lock().await;

        let file = self.record_file(&key);
        let current = self.read(&file).await?;

        let record = match update.apply(&key, current.as_ref())? {
            Some(record) => record,
            None => return Ok(current),
        };

        let raw = serde_json::to_vec_pretty(&record)?;
        write_atomically(&file, &raw).await?;

        log::debug!("Updated the share record for \"{}\"", key);
        Ok(Some(record))
    }

    async fn rename(
        &self,
        old_path: &str,
        new_path: &str,
    ) -> Result<bool, CacheError> {
        let old_key = canonical_key(old_path)?;
        let new_key = canonical_key(new_path)?;
        let _guard = self.lock.lock().await;

        let from = self.record_file(&old_key);
        if self.read(&from).await?.is_none() {
            return Ok(false);
        }
        if old_key == new_key {
            return Ok(true);
        }

        let to = self.record_file(&new_key);
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::io(parent, e))?;
        }
        fs::rename(&from, &to)
            .await
            .map_err(|e| CacheError::io(&from, e))?;
        self.prune_empty_parents(&from).await;

        log::debug!("Moved the share record for \"{}\" to \"{}\"", old_key, new_key);
        Ok(true)
    }

    async fn entries(&self) -> Result<Vec<(String, ShareRecord)>, CacheError> {
        let mut entries = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut listing = fs::read_dir(&dir)
                .await
                .map_err(|e| CacheError::io(&dir, e))?;

            while let Some(entry) = listing
                .next_entry()
                .await
                .map_err(|e| CacheError::io(&dir, e))?
            {
                let file = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| CacheError::io(&file, e))?;

                if file_type.is_dir() {
                    pending.push(file);
                    continue;
                }

                let path = match self.document_path(&file) {
                    Some(path) => path,
                    // leftover temporary files, etc.
                    None => continue,
                };
                if let Some(record) = self.read(&file).await? {
                    entries.push((path, record));
                }
            }
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}
