//! Edit-secret hashing.
//!
//! The secret presented at creation is never stored. Instead the store keeps
//! `hex(salt) ++ "$" ++ hex(sha256(salt ++ secret))`, and verification
//! recomputes the digest for the presented credential and compares the two
//! digests in constant time.

use std::fmt;

use constant_time_eq::constant_time_eq;
use sha2::{Digest, Sha256};
use uuid::Uuid;

const SALT_LEN: usize = 16;

/// Salted SHA-256 digest of a campaign's edit secret.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretHash {
    salt: [u8; SALT_LEN],
    digest: [u8; 32],
}

impl SecretHash {
    /// Hash `secret` under a fresh random salt.
    pub fn new(secret: &str) -> Self {
        let salt = *Uuid::new_v4().as_bytes();
        Self {
            salt,
            digest: digest(&salt, secret),
        }
    }

    /// Whether `credential` is exactly the secret this hash was built from.
    pub fn verify(&self, credential: &str) -> bool {
        constant_time_eq(&digest(&self.salt, credential), &self.digest)
    }

    /// Encode for persistence as `salt$digest`, both lowercase hex.
    pub fn encode(&self) -> String {
        format!("{}${}", hex::encode(self.salt), hex::encode(self.digest))
    }

    /// Parse the form produced by [`SecretHash::encode`].
    pub fn decode(encoded: &str) -> Option<Self> {
        let (salt_hex, digest_hex) = encoded.split_once('$')?;
        let salt: [u8; SALT_LEN] = hex::decode(salt_hex).ok()?.try_into().ok()?;
        let digest: [u8; 32] = hex::decode(digest_hex).ok()?.try_into().ok()?;
        Some(Self { salt, digest })
    }
}

impl fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretHash(<redacted>)")
    }
}

fn digest(salt: &[u8; SALT_LEN], secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret.as_bytes());
    hasher.finalize().into()
}
