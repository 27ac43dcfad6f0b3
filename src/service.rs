use crate::{
    cache::CacheError,
    endpoints::{self, CreateNote, CryptoVersion, DeleteNote, EndpointError},
    keys::{CryptoError, Secret},
    utils, Attachment, Envelope,
};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_derive::{Deserialize, Serialize};

/// Encrypts notes and uploads them to a note server.
///
/// The service only remembers where the server is and who we are. Keeping
/// track of what has been shared is the caller's job (see
/// [`ShareCache`](crate::ShareCache)).
#[derive(Debug, Clone)]
pub struct NoteSharingService {
    client: Client,
    base_url: String,
    user_id: String,
    plugin_version: String,
}

impl NoteSharingService {
    pub fn new(
        server_url: &str,
        user_id: &str,
        plugin_version: &str,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(crate::DEFAULT_USER_AGENT)
            .build()?;

        Ok(NoteSharingService::with_client(
            client,
            server_url,
            user_id,
            plugin_version,
        ))
    }

    pub fn with_client(
        client: Client,
        server_url: &str,
        user_id: &str,
        plugin_version: &str,
    ) -> Self {
        NoteSharingService {
            client,
            base_url: utils::normalize_url(server_url),
            user_id: user_id.to_string(),
            plugin_version: plugin_version.to_string(),
        }
    }

    pub fn server_url(&self) -> &str { &self.base_url }

    pub fn set_server_url(&mut self, server_url: &str) {
        self.base_url = utils::normalize_url(server_url);
    }

    pub fn user_id(&self) -> &str { &self.user_id }

    pub fn set_user_id(&mut self, user_id: &str) {
        self.user_id = user_id.to_string();
    }

    /// Encrypt a note and upload it, returning a link with the decryption key
    /// attached.
    pub async fn share_note(
        &self,
        body: &str,
        attachments: &[Attachment],
        options: &ShareOptions,
    ) -> Result<ShareResult, ShareError> {
        let envelope =
            Envelope::build(body, options.title.as_deref(), attachments);
        let plaintext = envelope.to_bytes()?;

        let secret = Secret::generate()?;
        let encoded = secret.encode();
        let ciphertext = secret.encrypt(&plaintext)?;

        let note = CreateNote {
            ciphertext: &ciphertext,
            iv: &encoded.iv,
            user_id: &self.user_id,
            plugin_version: &self.plugin_version,
            crypto_version: CryptoVersion::V3,
            embeded: &[],
        };
        let created =
            endpoints::create_note(&self.client, &self.base_url, &note).await?;

        // the key only ever travels in the fragment, which browsers don't
        // send to the server. The server's link is used exactly as given.
        let view_url = format!("{}#{}", created.view_url, encoded.key);
        log::info!("Note shared: {}", created.view_url);

        Ok(ShareResult {
            view_url,
            expire_time: created.expire_time,
            secret_token: created.secret_token,
            note_id: created.note_id,
        })
    }

    /// Remove a previously shared note from the server.
    pub async fn delete_note(
        &self,
        note_id: &str,
        secret_token: &str,
    ) -> Result<(), ShareError> {
        let data = DeleteNote {
            user_id: &self.user_id,
            secret_token,
        };
        endpoints::delete_note(&self.client, &self.base_url, note_id, &data)
            .await?;

        log::info!("Note {} deleted from {}", note_id, self.base_url);
        Ok(())
    }
}

/// Extra knobs for [`NoteSharingService::share_note()`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ShareOptions {
    pub title: Option<String>,
}

/// A successfully shared note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareResult {
    /// The link to the note, including the `#key` fragment.
    pub view_url: String,
    pub expire_time: DateTime<Utc>,
    /// Needed to delete the note later.
    pub secret_token: String,
    pub note_id: String,
}

/// Possible errors when sharing or unsharing a note.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("Unable to encrypt the note")]
    Crypto(#[from] CryptoError),
    #[error("Unable to serialize the note")]
    Envelope(#[from] serde_json::Error),
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error("Unable to update the share cache")]
    Cache(#[from] CacheError),
    /// The server has the note, but the share cache couldn't be updated.
    /// `result` is the only remaining way to delete it.
    #[error("Note {} was shared but couldn't be recorded", result.note_id)]
    NotRecorded {
        result: Box<ShareResult>,
        #[source]
        source: CacheError,
    },
}

impl ShareError {
    /// The HTTP status to show the user, if the server was involved.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ShareError::Endpoint(e) => e.status(),
            _ => None,
        }
    }
}
