// src/signer/mod.rs
mod audit;
mod directory;
mod kube;
mod loader;

pub use audit::AuditContext;
pub use directory::DirectoryStore;
pub use kube::KubeSecretStore;
pub use loader::{load_signer, CaSigner};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::StoreConfig;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("couldn't reach credential store: {0}")]
    Connection(String),

    #[error("couldn't get signer secret {namespace}/{name}: {reason}")]
    SecretMissing {
        namespace: String,
        name: String,
        reason: String,
    },

    #[error("signer secret has no {0} field")]
    FieldMissing(String),

    #[error("couldn't parse signer cert: {0}")]
    BadCertificate(String),

    #[error("couldn't parse signer key: {0}")]
    BadKey(String),
}

/// Where the CA material lives and which fields hold it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretLocator {
    pub namespace: String,
    pub name: String,
    pub cert_field: String,
    pub key_field: String,
}

impl Default for SecretLocator {
    fn default() -> Self {
        Self {
            namespace: "openshift-kube-controller-manager".to_string(),
            name: "csr-signer".to_string(),
            cert_field: "tls.crt".to_string(),
            key_field: "tls.key".to_string(),
        }
    }
}

/// PEM certificate and PEM private key exactly as stored.
pub struct SecretMaterial {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Attach requester metadata for the store's audit trail. Best effort:
    /// a store that can't carry it just ignores it.
    fn set_audit_context(&mut self, _audit: &AuditContext) {}

    async fn load_credentials(&self, locator: &SecretLocator) -> Result<SecretMaterial, SignerError>;
}

/// Build the configured store. Nothing is contacted until credentials are loaded.
pub fn store_from_config(config: &StoreConfig, kubeconfig: Option<PathBuf>) -> Box<dyn CredentialStore> {
    if let Some(path) = kubeconfig {
        return Box::new(KubeSecretStore::from_kubeconfig(path));
    }

    match config {
        StoreConfig::Kubernetes {
            kubeconfig: Some(path),
        } => Box::new(KubeSecretStore::from_kubeconfig(PathBuf::from(
            shellexpand::tilde(path).as_ref(),
        ))),
        StoreConfig::Kubernetes { kubeconfig: None } => Box::new(KubeSecretStore::in_cluster()),
        StoreConfig::Directory { path } => Box::new(DirectoryStore::new(PathBuf::from(
            shellexpand::tilde(path).as_ref(),
        ))),
    }
}
