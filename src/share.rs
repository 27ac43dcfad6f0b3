use crate::{
    cache::{CacheError, ShareCache, ShareRecord},
    service::{NoteSharingService, ShareError, ShareOptions, ShareResult},
    Attachment, Settings,
};
use chrono::Utc;
use std::sync::Arc;

/// Shares documents and keeps the [`ShareCache`] in sync with the vault.
///
/// This is what a host application talks to. It forwards vault events
/// (renames and deletes) and share/unshare requests, and the [`Sharer`]
/// makes sure a record is only written once the server has accepted a
/// request.
pub struct Sharer {
    service: NoteSharingService,
    cache: Arc<dyn ShareCache>,
    share_filename_as_title: bool,
}

impl Sharer {
    pub fn new(
        service: NoteSharingService,
        cache: Arc<dyn ShareCache>,
        share_filename_as_title: bool,
    ) -> Self {
        Sharer {
            service,
            cache,
            share_filename_as_title,
        }
    }

    pub fn from_settings(
        settings: &Settings,
        cache: Arc<dyn ShareCache>,
    ) -> Result<Self, reqwest::Error> {
        let service = NoteSharingService::new(
            &settings.server_url,
            &settings.anonymous_user_id,
            crate::VERSION,
        )?;

        Ok(Sharer::new(service, cache, settings.share_filename_as_title))
    }

    /// Pick up changes the user made to their [`Settings`].
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.service.set_server_url(&settings.server_url);
        self.service.set_user_id(&settings.anonymous_user_id);
        self.share_filename_as_title = settings.share_filename_as_title;
    }

    pub fn service(&self) -> &NoteSharingService { &self.service }

    pub fn cache(&self) -> &dyn ShareCache { &*self.cache }

    /// Share a document, recording the new share under `path`.
    ///
    /// Sharing a document again creates a brand new note rather than
    /// updating the old one.
    pub async fn share_document(
        &self,
        path: &str,
        basename: &str,
        body: &str,
        attachments: &[Attachment],
    ) -> Result<ShareResult, ShareError> {
        // also makes sure the path is usable before anything gets uploaded
        let previous = self.cache.get(path).await?;

        let options = ShareOptions {
            title: if self.share_filename_as_title {
                Some(basename.to_string())
            } else {
                None
            },
        };
        let result = self.service.share_note(body, attachments, &options).await?;

        let mut record = ShareRecord::new(&result, basename, Utc::now());
        if previous.map_or(false, |p| p.is_live()) {
            record.updated_datetime = Some(record.shared_datetime);
        }
        if let Err(e) = self.cache.set(path, record.into()).await {
            // without the record nothing local knows how to delete the note
            log::warn!(
                "Shared \"{}\" as note {} (secret token {}) but couldn't record it: {}",
                path,
                result.note_id,
                result.secret_token,
                e
            );
            return Err(ShareError::NotRecorded {
                result: Box::new(result),
                source: e,
            });
        }

        Ok(result)
    }

    /// Delete the note shared from `path`.
    ///
    /// Returns `false` if the document was never shared or has already been
    /// unshared.
    pub async fn unshare_document(&self, path: &str) -> Result<bool, ShareError> {
        let record = match self.cache.get(path).await? {
            Some(record) if record.is_live() => record,
            Some(_) => {
                log::debug!("\"{}\" has already been unshared", path);
                return Ok(false);
            },
            None => return Ok(false),
        };

        self.service
            .delete_note(&record.note_id, &record.secret_token)
            .await?;
        self.cache.mark_deleted_from_server(path).await?;

        log::info!("Unshared note: \"{}\"", record.basename);
        Ok(true)
    }

    /// The host moved a document.
    pub async fn document_renamed(
        &self,
        old_path: &str,
        new_path: &str,
    ) -> Result<bool, CacheError> {
        let moved = self.cache.rename(old_path, new_path).await?;
        if moved {
            log::debug!("Renamed \"{}\" to \"{}\"", old_path, new_path);
        }

        Ok(moved)
    }

    /// The host deleted a document. The record is kept so the note can still
    /// be unshared.
    pub async fn document_deleted(&self, path: &str) -> Result<bool, CacheError> {
        let marked = self.cache.mark_deleted_from_vault(path).await?;
        if marked {
            log::debug!("Deleted \"{}\"", path);
        }

        Ok(marked)
    }
}
