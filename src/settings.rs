use serde_derive::{Deserialize, Serialize};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

pub const DEFAULT_SERVER_URL: &str = "https://noteshare.space";

/// User-facing configuration.
///
/// The host application owns these and hands them over when it constructs a
/// [`Sharer`](crate::Sharer). Missing fields fall back to their defaults so
/// settings written by older versions still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub server_url: String,
    /// Sent with every request so the server can rate limit without knowing
    /// who we are.
    pub anonymous_user_id: String,
    /// Use the document's file name as the shared note's title.
    pub share_filename_as_title: bool,
    /// Store share records as one file per document instead of a single
    /// JSON file.
    pub use_fs_cache: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            server_url: String::from(DEFAULT_SERVER_URL),
            anonymous_user_id: random_user_id(),
            share_filename_as_title: false,
            use_fs_cache: false,
        }
    }
}

impl Settings {
    /// Read settings from disk, using the defaults if nothing has been saved
    /// yet.
    pub async fn load(path: &Path) -> Result<Self, SettingsError> {
        match tokio::fs::read(path).await {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!(
                    "No settings at {}, using the defaults",
                    path.display()
                );
                Ok(Settings::default())
            },
            Err(e) => Err(SettingsError::io(path, e)),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let raw = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, raw)
            .await
            .map_err(|e| SettingsError::io(path, e))
    }
}

/// A random identifier that doesn't reveal anything about the user.
pub fn random_user_id() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Unable to access \"{}\"", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Unable to parse the settings")]
    Serialization(#[from] serde_json::Error),
}

impl SettingsError {
    fn io(path: &Path, source: io::Error) -> Self {
        SettingsError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_the_defaults() {
        let src = r#"{
            "serverUrl": "https://example.com",
            "useFrontmatter": true
        }"#;

        let got: Settings = serde_json::from_str(src).unwrap();

        assert_eq!(got.server_url, "https://example.com");
        assert_eq!(got.anonymous_user_id.len(), 32);
        assert!(!got.share_filename_as_title);
        assert!(!got.use_fs_cache);
    }

    #[test]
    fn user_ids_are_random() {
        assert_ne!(random_user_id(), random_user_id());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            share_filename_as_title: true,
            use_fs_cache: true,
            ..Settings::default()
        };

        settings.save(&path).await.unwrap();
        let got = Settings::load(&path).await.unwrap();

        assert_eq!(got, settings);
    }

    #[tokio::test]
    async fn loading_a_missing_file_gives_the_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let got = Settings::load(&dir.path().join("nope.json")).await.unwrap();

        assert_eq!(got.server_url, DEFAULT_SERVER_URL);
    }
}
