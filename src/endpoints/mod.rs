//! The note server's endpoints.

mod create_note;
mod delete_note;

pub use create_note::{create_note, CreateNote, CryptoVersion, NoteCreated};
pub use delete_note::{delete_note, DeleteNote};

use reqwest::{Client, Error, Method, Response, StatusCode};
use serde::Serialize;
use std::fmt::Debug;

/// Typical endpoint errors.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// The HTTP client encountered an error.
    #[error("Unable to send the request")]
    HttpClient(#[from] Error),
    /// The server responded with something other than `200 OK`.
    #[error("The server rejected the request ({}): {}", status, body)]
    Rejected { status: StatusCode, body: String },
    /// Unable to parse the JSON in the response.
    #[error("Unable to parse the response")]
    BadResponse(#[from] serde_json::Error),
}

impl EndpointError {
    /// The status code the server responded with, if it got that far.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            EndpointError::Rejected { status, .. } => Some(*status),
            EndpointError::HttpClient(e) => e.status(),
            EndpointError::BadResponse(_) => None,
        }
    }
}

async fn send<D>(
    client: &Client,
    method: Method,
    url: &str,
    data: &D,
) -> Result<Response, EndpointError>
where
    D: Debug + Serialize,
{
    log::debug!("Sending a {} request to {}", method, url);
    log::trace!("Payload: {:#?}", data);
    let response = client.request(method, url).json(data).send().await?;

    log::trace!("Headers: {:#?}", response.headers());

    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await?;
        log::debug!("The server responded with {}: {}", status, body);

        return Err(EndpointError::Rejected { status, body });
    }

    Ok(response)
}
