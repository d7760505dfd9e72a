// src/signer/kube.rs
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use openssl::pkey::PKey;
use reqwest::{Certificate, Client, Identity, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::{AuditContext, CredentialStore, SecretLocator, SecretMaterial, SignerError};
use crate::kubeconfig::ClusterConnection;

enum ConnectionSource {
    InCluster,
    Kubeconfig(PathBuf),
}

/// Reads the signer secret straight from the Kubernetes API.
pub struct KubeSecretStore {
    source: ConnectionSource,
    user_agent: Option<String>,
}

#[derive(Deserialize)]
struct Secret {
    #[serde(default)]
    data: HashMap<String, String>,
}

impl KubeSecretStore {
    pub fn in_cluster() -> Self {
        Self {
            source: ConnectionSource::InCluster,
            user_agent: None,
        }
    }

    pub fn from_kubeconfig(path: PathBuf) -> Self {
        Self {
            source: ConnectionSource::Kubeconfig(path),
            user_agent: None,
        }
    }

    fn connection(&self) -> Result<ClusterConnection, SignerError> {
        let conn = match &self.source {
            ConnectionSource::InCluster => ClusterConnection::in_cluster(),
            ConnectionSource::Kubeconfig(path) => ClusterConnection::from_kubeconfig(path),
        };
        conn.map_err(|e| SignerError::Connection(e.to_string()))
    }

    fn client(&self, conn: &ClusterConnection) -> Result<Client, SignerError> {
        let mut builder = Client::builder();

        if let Some(ca) = &conn.ca_pem {
            let ca = Certificate::from_pem(ca)
                .map_err(|e| SignerError::Connection(format!("bad cluster CA: {}", e)))?;
            builder = builder.add_root_certificate(ca);
        }

        if let Some((cert, key)) = &conn.client_identity {
            // native-tls wants PKCS#8; kubeconfigs usually carry PKCS#1
            let key = PKey::private_key_from_pem(key)
                .and_then(|k| k.private_key_to_pem_pkcs8())
                .map_err(|e| SignerError::Connection(format!("bad client key: {}", e)))?;
            let identity = Identity::from_pkcs8_pem(cert, &key)
                .map_err(|e| SignerError::Connection(format!("bad client certificate: {}", e)))?;
            builder = builder.identity(identity);
        }

        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.as_str());
        }

        builder
            .build()
            .map_err(|e| SignerError::Connection(format!("couldn't build kube client: {}", e)))
    }
}

#[async_trait]
impl CredentialStore for KubeSecretStore {
    fn set_audit_context(&mut self, audit: &AuditContext) {
        let agent = audit.user_agent();
        if reqwest::header::HeaderValue::from_str(&agent).is_ok() {
            self.user_agent = Some(agent);
        } else {
            warn!("audit context isn't a valid header value, sending default user agent");
        }
    }

    async fn load_credentials(&self, locator: &SecretLocator) -> Result<SecretMaterial, SignerError> {
        let conn = self.connection()?;
        let client = self.client(&conn)?;

        let url = conn
            .server
            .join(&format!(
                "api/v1/namespaces/{}/secrets/{}",
                locator.namespace, locator.name
            ))
            .map_err(|e| SignerError::Connection(e.to_string()))?;
        debug!("fetching {}", url);

        let mut request = client.get(url);
        if let Some(token) = &conn.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SignerError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = match status {
                StatusCode::NOT_FOUND => "not found".to_string(),
                other => format!("API server returned {}", other),
            };
            return Err(SignerError::SecretMissing {
                namespace: locator.namespace.clone(),
                name: locator.name.clone(),
                reason,
            });
        }

        let secret: Secret = response
            .json()
            .await
            .map_err(|e| SignerError::Connection(format!("bad secret body: {}", e)))?;

        Ok(SecretMaterial {
            cert_pem: secret_field(&secret, &locator.cert_field)?,
            key_pem: secret_field(&secret, &locator.key_field)?,
        })
    }
}

fn secret_field(secret: &Secret, field: &str) -> Result<Vec<u8>, SignerError> {
    let value = secret
        .data
        .get(field)
        .ok_or_else(|| SignerError::FieldMissing(field.to_string()))?;
    general_purpose::STANDARD
        .decode(value)
        .map_err(|e| SignerError::BadCertificate(format!("{} is not base64: {}", field, e)))
}
