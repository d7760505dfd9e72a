// src/keys/mod.rs
mod fingerprint;
mod identity;
mod material;
mod provision;
mod sign_key;

pub use fingerprint::Fingerprint;
pub use identity::IdentityKey;
pub use material::KeyMaterial;
pub use provision::{generate_keypair, EphemeralKeypair};
pub use sign_key::parse_sign_key;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("missing identity key")]
    MissingIdentityKey,

    #[error("bad identity key: {0}")]
    BadIdentityKey(String),

    #[error("couldn't decode sign key: {0}")]
    SignKeyDecode(String),

    #[error("bad sign key encoding (expected PEM)")]
    SignKeyEncoding,

    #[error("unexpected key type {0}")]
    UnexpectedPemType(String),

    #[error("bad sign key: {0}")]
    BadSignKey(String),

    #[error("unsupported key algorithm {0}")]
    UnsupportedAlgorithm(String),

    #[error("failed to generate a new keypair: {0}")]
    Generation(String),
}
