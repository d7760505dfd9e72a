// src/error.rs
use thiserror::Error;

use crate::authz::AuthzError;
use crate::cert::IssueError;
use crate::keys::KeyError;
use crate::signer::SignerError;
use crate::verify::VerifyError;

/// Every way an issuance can fail. Each variant is fatal to the invocation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    Input(#[from] KeyError),

    #[error("verification failed: {0}")]
    Verification(#[from] VerifyError),

    #[error("authorization failed: {0}")]
    Authorization(#[from] AuthzError),

    #[error("signer unavailable: {0}")]
    SignerUnavailable(#[from] SignerError),

    #[error("issuance failed: {0}")]
    Issuance(#[from] IssueError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Process exit status for this failure category.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Input(_) => 2,
            Error::Verification(_) => 3,
            Error::Authorization(_) => 4,
            Error::SignerUnavailable(_) => 5,
            Error::Issuance(_) => 6,
            Error::Config(_) => 7,
        }
    }
}
