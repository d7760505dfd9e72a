// config/types.rs
use serde::{Deserialize, Serialize};
use std::{fs, io};

use crate::authz::{AuthorizedSource, DuplicatePolicy};
use crate::cert::SubjectConfig;
use crate::signer::SecretLocator;

/// Where the CA secret is read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Kubernetes API; in-cluster service account unless a kubeconfig is named.
    Kubernetes {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kubeconfig: Option<String>,
    },
    /// A mounted secret volume, one file per secret field.
    Directory { path: String },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Kubernetes { kubeconfig: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerConfig {
    pub authorized_keys: Vec<AuthorizedSource>,
    pub signer: SecretLocator,
    pub store: StoreConfig,
    pub subject: SubjectConfig,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            authorized_keys: vec![AuthorizedSource {
                path: "${AUTHORIZED_KEYS_DIR}/aos-sre/authorized_keys".to_string(),
                group: "osd-sre-admins".to_string(),
            }],
            signer: SecretLocator::default(),
            store: StoreConfig::default(),
            subject: SubjectConfig::default(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl IssuerConfig {
    pub fn load_from_file(path: &str) -> io::Result<Self> {
        let config_str = fs::read_to_string(shellexpand::tilde(path).as_ref())?;
        serde_json::from_str(&config_str).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn validate(&self) -> io::Result<()> {
        if let Some(source) = self.authorized_keys.iter().find(|s| s.group.trim().is_empty()) {
            return Err(invalid(format!("authorized keys source {} has no group", source.path)));
        }
        if self.signer.namespace.is_empty() || self.signer.name.is_empty() {
            return Err(invalid("signer secret namespace and name are required".to_string()));
        }
        if self.signer.cert_field.is_empty() || self.signer.key_field.is_empty() {
            return Err(invalid("signer secret field names are required".to_string()));
        }
        if let StoreConfig::Directory { path } = &self.store {
            if path.is_empty() {
                return Err(invalid("directory store needs a path".to_string()));
            }
        }
        Ok(())
    }
}

fn invalid(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}
