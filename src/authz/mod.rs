mod index;

pub use index::{AuthorizationTable, AuthorizedSource, DuplicatePolicy};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("identity key {0} wasn't found in any authorized_keys file")]
    NotAuthorized(String),

    #[error("key {fingerprint} is authorized for both {existing} and {group}")]
    Conflict {
        fingerprint: String,
        existing: String,
        group: String,
    },
}
