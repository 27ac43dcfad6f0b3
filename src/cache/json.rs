use super::{
    canonical_key, write_atomically, CacheError, CacheUpdate, ShareCache,
    ShareRecord,
};
use async_trait::async_trait;
use std::{collections::BTreeMap, io::ErrorKind, path::PathBuf};
use tokio::sync::Mutex;

type Records = BTreeMap<String, ShareRecord>;

/// A cache which keeps every record in memory and mirrors them to a single
/// JSON file.
#[derive(Debug)]
pub struct JsonCache {
    path: PathBuf,
    records: Mutex<Records>,
}

impl JsonCache {
    /// Load the cache from disk, starting empty if the file doesn't exist
    /// yet.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, CacheError> {
        let path = path.into();

        let records: Records = match tokio::fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Records::new(),
            Err(e) => return Err(CacheError::io(&path, e)),
        };
        log::debug!(
            "Loaded {} share records from {}",
            records.len(),
            path.display()
        );

        Ok(JsonCache {
            path,
            records: Mutex::new(records),
        })
    }

    async fn persist(&self, records: &Records) -> Result<(), CacheError> {
        let raw = serde_json::to_vec_pretty(records)?;
        write_atomically(&self.path, &raw).await
    }
}

#[async_trait]
impl ShareCache for JsonCache {
    async fn has(&self, path: &str) -> Result<bool, CacheError> {
        let key = canonical_key(path)?;
        Ok(self.records.lock().await.contains_key(&key))
    }

    async fn get(&self, path: &str) -> Result<Option<ShareRecord>, CacheError> {
        let key = canonical_key(path)?;
        Ok(self.records.lock().await.get(&key).cloned())
    }

    async fn set(
        &self,
        path: &str,
        update: CacheUpdate,
    ) -> Result<Option<ShareRecord>, CacheError> {
        let key = canonical_key(path)?;
        let mut records = self.records.lock().await;

        let record = match update.apply(&key, records.get(&key))? {
            Some(record) => record,
            None => return Ok(records.get(&key).cloned()),
        };

        // only commit in memory once the new state is on disk
        let mut updated = records.clone();
        updated.insert(key.clone(), record.clone());
        self.persist(&updated).await?;
        *records = updated;

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
        let mut records = self.records.lock().await;

        if !records.contains_key(&old_key) {
            return Ok(false);
        }
        if old_key == new_key {
            return Ok(true);
        }

        let mut updated = records.clone();
        if let Some(record) = updated.remove(&old_key) {
            updated.insert(new_key.clone(), record);
        }
        self.persist(&updated).await?;
        *records = updated;

        log::debug!("Moved the share record for \"{}\" to \"{}\"", old_key, new_key);
        Ok(true)
    }

    async fn entries(&self) -> Result<Vec<(String, ShareRecord)>, CacheError> {
        let records = self.records.lock().await;

        Ok(records
            .iter()
            .map(|(path, record)| (path.clone(), record.clone()))
            .collect())
    }
}
