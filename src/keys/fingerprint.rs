// src/keys/fingerprint.rs
use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use std::fmt;

/// Prefix of the audit entry placed in the certificate subject.
pub const AUDIT_PREFIX: &str = "ssh:sha256:";

/// Number of fingerprint bytes shown in the certificate common name.
const SHORT_LEN: usize = 12;

/// SHA-256 over the SSH wire encoding of a public key.
///
/// Never computed over the text or PEM form, so the same key always has the
/// same fingerprint however it was supplied.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of_wire(wire: &[u8]) -> Self {
        Self(Sha256::digest(wire).into())
    }

    /// Unpadded standard base64, as printed by `ssh-keygen -l`.
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD_NO_PAD.encode(self.0)
    }

    /// Base58 of the first bytes, short enough for a display name.
    pub fn short_base58(&self) -> String {
        bs58::encode(&self.0[..SHORT_LEN]).into_string()
    }

    pub fn audit_label(&self) -> String {
        format!("{}{}", AUDIT_PREFIX, self.to_base64())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SHA256:{}", self.to_base64())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}
