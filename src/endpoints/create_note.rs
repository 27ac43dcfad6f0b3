use super::EndpointError;
use crate::envelope::EmbeddedFile;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method};
use serde_derive::{Deserialize, Serialize};

/// Upload an encrypted note.
pub async fn create_note(
    client: &Client,
    base_url: &str,
    note: &CreateNote<'_>,
) -> Result<NoteCreated, EndpointError> {
    let url = format!("{}/api/note", base_url);
    let response = super::send(client, Method::POST, &url, note).await?;

    let body = response.text().await?;
    log::trace!("Response: {}", body);

    let created: NoteCreated = serde_json::from_str(&body)?;
    log::trace!("Parsed response: {:#?}", created);

    Ok(created)
}

/// The body of a create request.
#[derive(Debug, Clone, Serialize)]
pub struct CreateNote<'a> {
    pub ciphertext: &'a str,
    pub iv: &'a str,
    pub user_id: &'a str,
    pub plugin_version: &'a str,
    pub crypto_version: CryptoVersion,
    /// Separately encrypted attachments. Always empty under
    /// [`CryptoVersion::V3`] because attachments travel inside the envelope.
    pub embeded: &'a [EmbeddedFile],
}

/// Tells the server (and the viewer it serves) how a note was encrypted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CryptoVersion {
    /// AES-256-GCM with a 128-bit nonce over a JSON envelope containing the
    /// body, title and base64-encoded images.
    #[serde(rename = "v3")]
    V3,
}

/// What the server sends back after a note is uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteCreated {
    pub view_url: String,
    pub expire_time: DateTime<Utc>,
    pub secret_token: String,
    pub note_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_create_response() {
        let src = r#"{
            "view_url": "https://x/n/1",
            "expire_time": "2030-01-01T00:00:00Z",
            "secret_token": "tok",
            "note_id": "1"
        }"#;
        let should_be = NoteCreated {
            view_url: String::from("https://x/n/1"),
            expire_time: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
            secret_token: String::from("tok"),
            note_id: String::from("1"),
        };

        let got: NoteCreated = serde_json::from_str(src).unwrap();

        assert_eq!(got, should_be);
    }

    #[test]
    fn offsets_are_converted_to_utc() {
        let src = r#"{
            "view_url": "https://x/n/1",
            "expire_time": "2030-01-01T02:00:00+02:00",
            "secret_token": "tok",
            "note_id": "1"
        }"#;

        let got: NoteCreated = serde_json::from_str(src).unwrap();

        assert_eq!(
            got.expire_time,
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn serialize_create_request() {
        let note = CreateNote {
            ciphertext: "abc=",
            iv: "AAAA",
            user_id: "user",
            plugin_version: "1.0.0",
            crypto_version: CryptoVersion::V3,
            embeded: &[],
        };
        let should_be = serde_json::json!({
            "ciphertext": "abc=",
            "iv": "AAAA",
            "user_id": "user",
            "plugin_version": "1.0.0",
            "crypto_version": "v3",
            "embeded": [],
        });

        let got = serde_json::to_value(&note).unwrap();

        assert_eq!(got, should_be);
    }
}
