// src/signer/directory.rs
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use tokio::fs;

use super::{CredentialStore, SecretLocator, SecretMaterial, SignerError};

/// A secret mounted as a volume: one file per secret field.
pub struct DirectoryStore {
    path: PathBuf,
}

impl DirectoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn read_field(&self, locator: &SecretLocator, field: &str) -> Result<Vec<u8>, SignerError> {
        let file = self.path.join(field);
        match fs::read(&file).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if fs::metadata(&self.path).await.is_ok() {
                    Err(SignerError::FieldMissing(field.to_string()))
                } else {
                    Err(SignerError::SecretMissing {
                        namespace: locator.namespace.clone(),
                        name: locator.name.clone(),
                        reason: format!("{} does not exist", self.path.display()),
                    })
                }
            }
            Err(e) => Err(SignerError::Connection(format!("{}: {}", file.display(), e))),
        }
    }
}

#[async_trait]
impl CredentialStore for DirectoryStore {
    async fn load_credentials(&self, locator: &SecretLocator) -> Result<SecretMaterial, SignerError> {
        Ok(SecretMaterial {
            cert_pem: self.read_field(locator, &locator.cert_field).await?,
            key_pem: self.read_field(locator, &locator.key_field).await?,
        })
    }
}
