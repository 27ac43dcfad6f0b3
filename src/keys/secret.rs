use super::{CryptoError, KEY_LEN};
use aes::Aes256;
use aes_gcm::{
    aead::{consts::U16, Aead, KeyInit},
    AesGcm, Nonce,
};
use base64::{
    engine::general_purpose::{GeneralPurpose, STANDARD, URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};
use hmac::Hmac;
use rand::{rngs::OsRng, RngCore};
use serde_derive::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt::{self, Debug, Formatter};

/// AES-256-GCM with the 128-bit nonce the note viewer expects.
type Cipher = AesGcm<Aes256, U16>;

/// The symmetric key and nonce used to encrypt a single shared note.
///
/// A fresh [`Secret`] must be generated for every share. Reusing one for two
/// different payloads breaks GCM's security guarantees.
#[derive(Clone)]
pub struct Secret {
    key: [u8; Secret::KEY_LEN],
    iv: [u8; Secret::IV_LEN],
}

impl Secret {
    pub const KEY_LEN: usize = KEY_LEN;
    pub const IV_LEN: usize = 16;
    pub const SEED_LEN: usize = 64;
    /// The length of the key once it has been encoded for a URL fragment.
    pub const ENCODED_KEY_LEN: usize = 43;
    const ITERATIONS: u32 = 100_000;
    const SALT: [u8; 16] = [0; 16];

    /// Generate a new secret using the operating system's RNG.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut seed = [0; Secret::SEED_LEN];
        let mut iv = [0; Secret::IV_LEN];
        OsRng.try_fill_bytes(&mut seed).map_err(|_| CryptoError::Rng)?;
        OsRng.try_fill_bytes(&mut iv).map_err(|_| CryptoError::Rng)?;

        Secret::derive(&seed, iv)
    }

    /// Stretch a random seed into a key.
    ///
    /// The seed is already uniformly random, so the PBKDF2 pass only adds
    /// depth. It is kept so keys match the ones the note viewer was built
    /// against.
    pub fn derive(
        seed: &[u8; Secret::SEED_LEN],
        iv: [u8; Secret::IV_LEN],
    ) -> Result<Self, CryptoError> {
        let mut key = [0; Secret::KEY_LEN];
        pbkdf2::pbkdf2::<Hmac<Sha256>>(
            seed,
            &Secret::SALT,
            Secret::ITERATIONS,
            &mut key,
        )
        .map_err(|_| CryptoError::InvalidLength {
            field: "key",
            expected: Secret::KEY_LEN,
            actual: key.len(),
        })?;

        Ok(Secret::from_raw(key, iv))
    }

    pub const fn from_raw(
        key: [u8; Secret::KEY_LEN],
        iv: [u8; Secret::IV_LEN],
    ) -> Self {
        Secret { key, iv }
    }

    /// Recover a [`Secret`] from its URL-safe text form.
    pub fn from_encoded(encoded: &EncodedSecret) -> Result<Self, CryptoError> {
        let key = decode_array(&URL_SAFE_NO_PAD, &encoded.key, "key")?;
        let iv = decode_array(&URL_SAFE, &encoded.iv, "iv")?;

        Ok(Secret::from_raw(key, iv))
    }

    /// Encode the key and nonce so they can be embedded in a URL.
    pub fn encode(&self) -> EncodedSecret {
        let mut key = URL_SAFE.encode(self.key);
        key.truncate(Secret::ENCODED_KEY_LEN);

        EncodedSecret {
            key,
            iv: URL_SAFE.encode(self.iv),
        }
    }

    /// Encrypt a payload, returning the base64-encoded ciphertext with the
    /// authentication tag appended.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::<U16>::from_slice(&self.iv), plaintext)
            .map_err(|_| CryptoError::Aead)?;

        Ok(STANDARD.encode(ciphertext))
    }

    /// The inverse of [`Secret::encrypt()`], as performed by the note viewer.
    pub fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, CryptoError> {
        let ciphertext = STANDARD
            .decode(ciphertext)
            .map_err(|_| CryptoError::BadEncoding {
                field: "ciphertext",
            })?;

        self.cipher()?
            .decrypt(Nonce::<U16>::from_slice(&self.iv), ciphertext.as_slice())
            .map_err(|_| CryptoError::Aead)
    }

    fn cipher(&self) -> Result<Cipher, CryptoError> {
        Cipher::new_from_slice(&self.key).map_err(|_| {
            CryptoError::InvalidLength {
                field: "key",
                expected: Secret::KEY_LEN,
                actual: self.key.len(),
            }
        })
    }
}

impl Debug for Secret {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Secret").field(&"<redacted>").finish()
    }
}

/// A [`Secret`] encoded as URL-safe base64.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedSecret {
    /// The key, truncated to [`Secret::ENCODED_KEY_LEN`] characters.
    pub key: String,
    pub iv: String,
}

impl Debug for EncodedSecret {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedSecret")
            .field("key", &"<redacted>")
            .field("iv", &self.iv)
            .finish()
    }
}

fn decode_array<const N: usize>(
    engine: &GeneralPurpose,
    text: &str,
    field: &'static str,
) -> Result<[u8; N], CryptoError> {
    let bytes = engine
        .decode(text)
        .map_err(|_| CryptoError::BadEncoding { field })?;

    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        CryptoError::InvalidLength {
            field,
            expected: N,
            actual: bytes.len(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG_LEN: usize = 16;

    #[test]
    fn derivation_is_deterministic() {
        let seed = [7; Secret::SEED_LEN];
        let iv = [3; Secret::IV_LEN];

        let first = Secret::derive(&seed, iv).unwrap();
        let second = Secret::derive(&seed, iv).unwrap();
        let other = Secret::derive(&[8; Secret::SEED_LEN], iv).unwrap();

        assert_eq!(first.encode(), second.encode());
        assert_ne!(first.encode().key, other.encode().key);
    }

    #[test]
    fn encoded_key_fits_in_a_url_fragment() {
        let secret = Secret::generate().unwrap();

        let encoded = secret.encode();

        assert_eq!(encoded.key.len(), Secret::ENCODED_KEY_LEN);
        assert!(encoded
            .key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
    }

    #[test]
    fn encoded_secret_decodes_to_the_same_secret() {
        let secret = Secret::from_raw([42; Secret::KEY_LEN], [9; Secret::IV_LEN]);

        let got = Secret::from_encoded(&secret.encode()).unwrap();

        assert_eq!(got.key, secret.key);
        assert_eq!(got.iv, secret.iv);
    }

    #[test]
    fn truncated_key_is_rejected() {
        let mut encoded = Secret::generate().unwrap().encode();
        encoded.key.truncate(20);

        let err = Secret::from_encoded(&encoded).unwrap_err();

        assert!(matches!(err, CryptoError::InvalidLength { field: "key", .. }));
    }

    #[test]
    fn encrypt_then_decrypt() {
        let secret = Secret::generate().unwrap();
        let plaintext = b"Hello, World!";

        let ciphertext = secret.encrypt(plaintext).unwrap();
        let got = secret.decrypt(&ciphertext).unwrap();

        assert_eq!(got, plaintext);
    }

    #[test]
    fn ciphertext_carries_the_tag() {
        let secret = Secret::from_raw([1; Secret::KEY_LEN], [2; Secret::IV_LEN]);

        let ciphertext = secret.encrypt(b"abc").unwrap();
        let raw = STANDARD.decode(ciphertext).unwrap();

        assert_eq!(raw.len(), 3 + TAG_LEN);
    }

    #[test]
    fn independent_secrets_give_different_ciphertext() {
        let plaintext = b"the same note, shared twice";

        let first = Secret::generate().unwrap().encrypt(plaintext).unwrap();
        let second = Secret::generate().unwrap().encrypt(plaintext).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn tampered_ciphertext_is_detected() {
        let secret = Secret::generate().unwrap();
        let mut raw = STANDARD
            .decode(secret.encrypt(b"do not touch").unwrap())
            .unwrap();
        raw[0] ^= 0xff;

        let err = secret.decrypt(&STANDARD.encode(raw)).unwrap_err();

        assert_eq!(err, CryptoError::Aead);
    }

    #[test]
    fn debug_output_hides_the_key() {
        let secret = Secret::from_raw([0xAB; Secret::KEY_LEN], [0; Secret::IV_LEN]);

        let got = format!("{:?}", secret);

        assert_eq!(got, r#"Secret("<redacted>")"#);
    }
}
