//! Admin gate
//!
//! The core never stores the admin flag; a presentation layer asks a
//! [`CredentialCheck`] and keeps the outcome in its own session state.

use sha2::{Digest, Sha256};

/// Verifies an admin secret
pub trait CredentialCheck: Send + Sync {
    fn verify(&self, secret: &str) -> bool;
}

/// Hex SHA-256 of `salt || secret`.
///
/// An empty salt gives the plain SHA-256 hex digest of the secret.
pub fn hash_secret(salt: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compares a salted SHA-256 of the offered secret against a stored hash
#[derive(Debug, Clone)]
pub struct Sha256Credential {
    salt: String,
    expected: Vec<u8>,
}

impl Sha256Credential {
    /// `expected_hex` is the hex digest produced by [`hash_secret`]
    pub fn new(salt: impl Into<String>, expected_hex: &str) -> Result<Self, hex::FromHexError> {
        let expected = hex::decode(expected_hex.trim())?;
        Ok(Self {
            salt: salt.into(),
            expected,
        })
    }
}

impl CredentialCheck for Sha256Credential {
    fn verify(&self, secret: &str) -> bool {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(secret.as_bytes());
        let digest = hasher.finalize();

        if digest.len() != self.expected.len() {
            return false;
        }
        // constant time over the digest
        digest
            .iter()
            .zip(&self.expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

/// Rejects every secret; used when no admin credential is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl CredentialCheck for DenyAll {
    fn verify(&self, _secret: &str) -> bool {
        false
    }
}
