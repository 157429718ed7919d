//! Password credentials
//!
//! Credentials are SHA-256 digests of the plaintext password followed by a
//! server-wide salt. The transform is deterministic: the same password and
//! salt always give the same credential, so sign-in recomputes the digest and
//! compares it with the stored value in constant time.

use hmac::digest::{CtOutput, Output};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Stored password credential
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Vec<u8>);

impl Credential {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// Password hashing service
///
/// Holds the salt for the lifetime of the process; cloning shares it.
#[derive(Clone)]
pub struct PasswordService {
    salt: Arc<SecretString>,
}

impl PasswordService {
    pub fn new(salt: impl Into<String>) -> Self {
        Self {
            salt: Arc::new(SecretString::new(salt.into())),
        }
    }

    fn digest(&self, password: &str) -> Output<Sha256> {
        Sha256::new()
            .chain_update(password.as_bytes())
            .chain_update(self.salt.expose_secret().as_bytes())
            .finalize()
    }

    /// Derive the credential for a plaintext password
    pub fn hash(&self, password: &str) -> Credential {
        Credential(self.digest(password).to_vec())
    }

    /// Check a plaintext password against a stored credential
    pub fn verify(&self, password: &str, stored: &Credential) -> bool {
        let Some(stored) = Output::<Sha256>::from_exact_iter(stored.as_bytes().iter().copied()) else {
            return false;
        };
        CtOutput::<Sha256>::new(self.digest(password)) == CtOutput::new(stored)
    }
}
