// src/keys/provision.rs
use openssl::pkey::PKey;
use std::fmt;

use super::{KeyError, KeyMaterial};

/// A freshly generated Ed25519 keypair. The private half leaves the process
/// exactly once, in the PEM output.
pub struct EphemeralKeypair {
    public: KeyMaterial,
    private_pkcs8: Vec<u8>,
}

impl EphemeralKeypair {
    pub fn public(&self) -> &KeyMaterial {
        &self.public
    }

    /// DER-encoded PKCS#8 private key.
    pub fn private_pkcs8(&self) -> &[u8] {
        &self.private_pkcs8
    }
}

impl fmt::Debug for EphemeralKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeypair")
            .field("public", &self.public)
            .field("private_pkcs8", &"<redacted>")
            .finish()
    }
}

pub fn generate_keypair() -> Result<EphemeralKeypair, KeyError> {
    let pkey = PKey::generate_ed25519().map_err(|e| KeyError::Generation(e.to_string()))?;
    let public = KeyMaterial::from_pkey(&pkey)?;
    let private_pkcs8 = pkey
        .private_key_to_pkcs8()
        .map_err(|e| KeyError::Generation(e.to_string()))?;

    Ok(EphemeralKeypair {
        public,
        private_pkcs8,
    })
}
