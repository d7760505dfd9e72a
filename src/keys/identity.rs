// src/keys/identity.rs
use ssh_key::{authorized_keys::Entry, PublicKey};
use std::str::FromStr;

use super::{Fingerprint, KeyError, KeyMaterial};

/// A parsed SSH identity key and the fingerprint of its wire encoding.
///
/// Any algorithm ssh-key understands is accepted, security keys included.
/// Only the equality check needs [`KeyMaterial`], so it is derived on demand.
#[derive(Debug, Clone)]
pub struct IdentityKey {
    key: PublicKey,
    fingerprint: Fingerprint,
}

impl IdentityKey {
    /// Parse one line of SSH public key text (eg: "ssh-ed25519 AAAAC3Nz... user@host").
    /// Leading authorized_keys options are accepted and ignored.
    pub fn parse(line: &str) -> Result<Self, KeyError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(KeyError::MissingIdentityKey);
        }

        let entry = Entry::from_str(line).map_err(|e| KeyError::BadIdentityKey(e.to_string()))?;
        Self::from_public_key(entry.public_key().clone())
    }

    pub fn from_public_key(key: PublicKey) -> Result<Self, KeyError> {
        let wire = key
            .to_bytes()
            .map_err(|e| KeyError::BadIdentityKey(e.to_string()))?;

        Ok(Self {
            fingerprint: Fingerprint::of_wire(&wire),
            key,
        })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.key
    }

    pub fn material(&self) -> Result<KeyMaterial, KeyError> {
        KeyMaterial::from_ssh(self.key.key_data())
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// SSH wire encoding of the key, as the agent protocol identifies keys.
    pub fn wire(&self) -> Result<Vec<u8>, KeyError> {
        self.key
            .to_bytes()
            .map_err(|e| KeyError::BadIdentityKey(e.to_string()))
    }

    pub fn comment(&self) -> &str {
        self.key.comment()
    }
}
