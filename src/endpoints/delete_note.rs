use super::EndpointError;
use reqwest::{Client, Method};
use serde_derive::Serialize;

/// Ask the server to remove a shared note.
pub async fn delete_note(
    client: &Client,
    base_url: &str,
    note_id: &str,
    data: &DeleteNote<'_>,
) -> Result<(), EndpointError> {
    let url = format!("{}/api/note/{}", base_url, note_id);
    super::send(client, Method::DELETE, &url, data).await?;

    Ok(())
}

/// The body of a delete request.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct DeleteNote<'a> {
    pub user_id: &'a str,
    /// The capability the server issued when the note was created.
    pub secret_token: &'a str,
}
