//! Share notes as end-to-end encrypted links.
//!
//! A note is packed into an [`Envelope`], encrypted with a fresh [`Secret`]
//! and uploaded. The server only ever sees ciphertext, and the key travels
//! in the link's `#fragment`. A [`ShareCache`] remembers what was shared so
//! it can be unshared later.

#![forbid(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod attachment;
pub mod cache;
pub mod endpoints;
pub mod envelope;
mod keys;
mod service;
mod settings;
mod share;
mod utils;

pub use attachment::{is_image, Attachment};
pub use cache::{CacheError, CacheUpdate, ShareCache, ShareRecord};
pub use envelope::{strip_frontmatter, Envelope};
pub use keys::{CryptoError, EncodedSecret, Secret};
pub use service::{NoteSharingService, ShareError, ShareOptions, ShareResult};
pub use settings::{Settings, SettingsError, DEFAULT_SERVER_URL};
pub use share::Sharer;
pub use utils::normalize_url;

/// The version reported to the server with every upload.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The default user agent to use when communicating with the note server.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));
