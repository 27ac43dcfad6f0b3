use crate::ShareResult;
use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

/// Everything we remember about a shared document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub note_id: String,
    /// Lets us delete the note from the server later.
    pub secret_token: String,
    /// The share link, decryption key included.
    pub view_url: String,
    pub shared_datetime: DateTime<Utc>,
    #[serde(default)]
    pub updated_datetime: Option<DateTime<Utc>>,
    pub expire_datetime: DateTime<Utc>,
    pub basename: String,
    /// The source document has been deleted locally.
    #[serde(default)]
    pub deleted_from_vault: bool,
    /// The server confirmed the note was deleted. Once set, the record can
    /// only be moved or replaced by a new share.
    #[serde(default)]
    pub deleted_from_server: bool,
}

impl ShareRecord {
    pub fn new(
        result: &ShareResult,
        basename: &str,
        shared_datetime: DateTime<Utc>,
    ) -> Self {
        ShareRecord {
            note_id: result.note_id.clone(),
            secret_token: result.secret_token.clone(),
            view_url: result.view_url.clone(),
            shared_datetime,
            updated_datetime: None,
            expire_datetime: result.expire_time,
            basename: basename.to_string(),
            deleted_from_vault: false,
            deleted_from_server: false,
        }
    }

    /// Is the note still available on the server?
    pub fn is_live(&self) -> bool { !self.deleted_from_server }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_datetime <= now
    }
}
