//! Key management.

mod secret;

const SHA256_LEN: usize =
    <<sha2::Sha256 as digest::OutputSizeUser>::OutputSize as typenum::marker_traits::Unsigned>::USIZE;
const KEY_LEN: usize = SHA256_LEN;

pub use secret::{EncodedSecret, Secret};

/// Something went wrong while generating a key or encrypting a payload.
///
/// These are never transient, so there is nothing to retry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CryptoError {
    #[error("The operating system's secure random number generator failed")]
    Rng,
    #[error("Expected a {} byte {}, found {} bytes", expected, field, actual)]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("The {} isn't valid base64", field)]
    BadEncoding { field: &'static str },
    #[error("AES-GCM rejected the payload")]
    Aead,
}
