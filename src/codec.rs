//! Authenticated encryption for session cookie values.
//!
//! A [`CodecChain`] is built from an ordered list of [`KeyPair`]s. The first
//! pair encodes; every pair is tried when decoding, so old keys can be kept at
//! the tail of the list while they are rotated out.
//!
//! Token layout (URL-safe base64, no padding):
//!
//! ```text
//! nonce (12 bytes) || AES-256-GCM(issued_at (8 bytes BE) || value)
//! ```
//!
//! The cookie name is bound as associated data, so a token minted for one
//! cookie does not decode under another name.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::session::unix_now;

/// Default maximum encoded token length, in bytes.
pub const DEFAULT_MAX_LENGTH: usize = 4096;

/// Default lifetime of an encoded token, in seconds (30 days).
pub const DEFAULT_TOKEN_MAX_AGE: i64 = 86400 * 30;

const NONCE_LEN: usize = 12;
const TIMESTAMP_LEN: usize = 8;

/// Errors raised while encoding or decoding cookie tokens.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A key pair was configured without a hash key.
    #[error("hash key is not set")]
    EmptyHashKey,

    /// No key pairs were configured.
    #[error("no codecs configured")]
    NoCodecs,

    /// The token is longer than the configured maximum.
    #[error("the value is too long: {len} > {max}")]
    TooLong {
        /// Observed length.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The token is not valid base64 or is too short to hold a nonce.
    #[error("the value is not valid")]
    Malformed,

    /// No configured key authenticated the token.
    #[error("the value could not be authenticated")]
    Authentication,

    /// The token authenticated but its issue timestamp is too old.
    #[error("expired timestamp")]
    Expired,

    /// Encryption failed.
    #[error("the value could not be encrypted")]
    Encrypt,
}

/// A hash key and an optional block key.
///
/// Both keys are folded into the AES-256 key, so either may be rotated.
#[derive(Clone, Default)]
pub struct KeyPair {
    /// Authentication key. Must not be empty.
    pub hash_key: Vec<u8>,
    /// Optional encryption key.
    pub block_key: Option<Vec<u8>>,
}

impl KeyPair {
    /// Creates a pair with both keys.
    pub fn new(hash_key: impl Into<Vec<u8>>, block_key: impl Into<Vec<u8>>) -> Self {
        Self {
            hash_key: hash_key.into(),
            block_key: Some(block_key.into()),
        }
    }

    /// Creates a pair with only a hash key.
    pub fn hash_only(hash_key: impl Into<Vec<u8>>) -> Self {
        Self {
            hash_key: hash_key.into(),
            block_key: None,
        }
    }

    /// Generates a pair of fresh 32-byte random keys.
    pub fn generate() -> Self {
        Self::new(generate_random_key(32), generate_random_key(32))
    }

    fn cipher(&self) -> Result<Aes256Gcm, CodecError> {
        if self.hash_key.is_empty() {
            return Err(CodecError::EmptyHashKey);
        }
        let block_key = self.block_key.as_deref().unwrap_or_default();
        let digest = Sha256::new()
            .chain_update((self.hash_key.len() as u64).to_be_bytes())
            .chain_update(&self.hash_key)
            .chain_update(block_key)
            .finalize();
        Aes256Gcm::new_from_slice(&digest).map_err(|_| CodecError::EmptyHashKey)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("hash_key", &"[redacted]")
            .field("block_key", &self.block_key.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Returns `len` bytes from the operating system RNG.
pub fn generate_random_key(len: usize) -> Vec<u8> {
    let mut key = vec![0u8; len];
    rand::rngs::OsRng.fill_bytes(&mut key);
    key
}

/// An ordered chain of ciphers used to seal and open cookie values.
pub struct CodecChain {
    ciphers: Vec<Aes256Gcm>,
    max_length: AtomicUsize,
    max_age: i64,
}

impl CodecChain {
    /// Builds a chain from key pairs, in priority order.
    pub fn from_pairs(pairs: &[KeyPair]) -> Result<Self, CodecError> {
        let ciphers = pairs
            .iter()
            .map(KeyPair::cipher)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            ciphers,
            max_length: AtomicUsize::new(DEFAULT_MAX_LENGTH),
            max_age: DEFAULT_TOKEN_MAX_AGE,
        })
    }

    /// Sets the token lifetime in seconds. Zero or negative disables the check.
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }

    /// Restricts the maximum encoded length. `0` removes the limit.
    pub fn set_max_length(&self, len: usize) {
        self.max_length.store(len, Ordering::Relaxed);
    }

    /// The current maximum encoded length.
    pub fn max_length(&self) -> usize {
        self.max_length.load(Ordering::Relaxed)
    }

    /// Seals `value` for the cookie `name` with the first key pair.
    pub fn encode(&self, name: &str, value: &str) -> Result<String, CodecError> {
        let cipher = self.ciphers.first().ok_or(CodecError::NoCodecs)?;

        let mut plaintext = Vec::with_capacity(TIMESTAMP_LEN + value.len());
        plaintext.extend_from_slice(&unix_now().to_be_bytes());
        plaintext.extend_from_slice(value.as_bytes());

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: &plaintext,
                    aad: name.as_bytes(),
                },
            )
            .map_err(|_| CodecError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        let token = URL_SAFE_NO_PAD.encode(sealed);

        self.check_length(token.len())?;
        Ok(token)
    }

    /// Opens a token produced by [`encode`](Self::encode), trying every key pair.
    pub fn decode(&self, name: &str, token: &str) -> Result<String, CodecError> {
        if self.ciphers.is_empty() {
            return Err(CodecError::NoCodecs);
        }
        self.check_length(token.len())?;

        let sealed = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| CodecError::Malformed)?;
        if sealed.len() < NONCE_LEN {
            return Err(CodecError::Malformed);
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce);

        let plaintext = self
            .ciphers
            .iter()
            .find_map(|cipher| {
                cipher
                    .decrypt(
                        nonce,
                        Payload {
                            msg: ciphertext,
                            aad: name.as_bytes(),
                        },
                    )
                    .ok()
            })
            .ok_or(CodecError::Authentication)?;

        if plaintext.len() < TIMESTAMP_LEN {
            return Err(CodecError::Malformed);
        }
        let (issued, value) = plaintext.split_at(TIMESTAMP_LEN);
        let mut stamp = [0u8; TIMESTAMP_LEN];
        stamp.copy_from_slice(issued);
        let issued = i64::from_be_bytes(stamp);
        if self.max_age > 0 && issued.saturating_add(self.max_age) < unix_now() {
            return Err(CodecError::Expired);
        }

        String::from_utf8(value.to_vec()).map_err(|_| CodecError::Malformed)
    }

    fn check_length(&self, len: usize) -> Result<(), CodecError> {
        let max = self.max_length();
        if max > 0 && len > max {
            return Err(CodecError::TooLong { len, max });
        }
        Ok(())
    }
}

impl fmt::Debug for CodecChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecChain")
            .field("codecs", &self.ciphers.len())
            .field("max_length", &self.max_length())
            .field("max_age", &self.max_age)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(pairs: &[KeyPair]) -> CodecChain {
        CodecChain::from_pairs(pairs).unwrap()
    }

    #[test]
    fn opens_what_it_seals() {
        let codecs = chain(&[KeyPair::generate()]);
        let token = codecs.encode("sess", "ABCDEF").unwrap();
        assert_eq!(codecs.decode("sess", &token).unwrap(), "ABCDEF");
    }

    #[test]
    fn cookie_name_is_authenticated() {
        let codecs = chain(&[KeyPair::generate()]);
        let token = codecs.encode("sess", "ABCDEF").unwrap();
        assert!(matches!(
            codecs.decode("other", &token),
            Err(CodecError::Authentication)
        ));
    }

    #[test]
    fn rotated_keys_still_decode() {
        let old = KeyPair::generate();
        let token = chain(&[old.clone()]).encode("sess", "id").unwrap();

        let rotated = chain(&[KeyPair::generate(), old]);
        assert_eq!(rotated.decode("sess", &token).unwrap(), "id");

        let dropped = chain(&[KeyPair::generate()]);
        assert!(dropped.decode("sess", &token).is_err());
    }

    #[test]
    fn rejects_garbage() {
        let codecs = chain(&[KeyPair::hash_only(b"secret".to_vec())]);
        assert!(matches!(
            codecs.decode("sess", "not base64!"),
            Err(CodecError::Malformed)
        ));
        assert!(matches!(
            codecs.decode("sess", "AAAA"),
            Err(CodecError::Malformed)
        ));
    }

    #[test]
    fn max_length_applies_both_ways() {
        let codecs = chain(&[KeyPair::generate()]);
        let token = codecs.encode("sess", "id").unwrap();

        codecs.set_max_length(10);
        assert!(matches!(
            codecs.encode("sess", "id"),
            Err(CodecError::TooLong { max: 10, .. })
        ));
        assert!(matches!(
            codecs.decode("sess", &token),
            Err(CodecError::TooLong { .. })
        ));

        codecs.set_max_length(0);
        assert_eq!(codecs.decode("sess", &token).unwrap(), "id");
    }

    #[test]
    fn empty_hash_key_is_rejected() {
        assert!(matches!(
            CodecChain::from_pairs(&[KeyPair::hash_only(Vec::new())]),
            Err(CodecError::EmptyHashKey)
        ));
    }

    #[test]
    fn unbounded_max_age_never_expires() {
        let codecs = chain(&[KeyPair::generate()]).with_max_age(i64::MAX);
        let token = codecs.encode("sess", "ID").unwrap();
        assert_eq!(codecs.decode("sess", &token).unwrap(), "ID");
    }

    #[test]
    fn empty_chain_cannot_encode() {
        let codecs = chain(&[]);
        assert!(matches!(codecs.encode("sess", "id"), Err(CodecError::NoCodecs)));
    }
}
