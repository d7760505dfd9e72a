// src/signer/loader.rs
use openssl::{
    pkey::{PKey, Private},
    x509::X509,
};
use tracing::{debug, info};

use super::{AuditContext, CredentialStore, SecretLocator, SignerError};

/// The trust root: CA certificate and its private key. Loaded fresh for
/// every issuance and never cached.
pub struct CaSigner {
    cert: X509,
    key: PKey<Private>,
}

impl CaSigner {
    /// Parse a PEM certificate and a PKCS#1, SEC1 or PKCS#8 PEM private key.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, SignerError> {
        let cert = X509::from_pem(cert_pem).map_err(|e| SignerError::BadCertificate(e.to_string()))?;
        let key =
            PKey::private_key_from_pem(key_pem).map_err(|e| SignerError::BadKey(e.to_string()))?;

        let cert_key = cert
            .public_key()
            .map_err(|e| SignerError::BadCertificate(e.to_string()))?;
        if !cert_key.public_eq(&key) {
            return Err(SignerError::BadKey(
                "private key does not match signer certificate".to_string(),
            ));
        }

        Ok(Self { cert, key })
    }

    pub fn cert(&self) -> &X509 {
        &self.cert
    }

    pub fn key(&self) -> &PKey<Private> {
        &self.key
    }
}

/// Fetch and parse the CA material. Any failure is final; there is no
/// fallback to earlier material.
pub async fn load_signer(
    store: &mut dyn CredentialStore,
    locator: &SecretLocator,
    audit: &AuditContext,
) -> Result<CaSigner, SignerError> {
    store.set_audit_context(audit);

    debug!("loading signer secret {}/{}", locator.namespace, locator.name);
    let material = store.load_credentials(locator).await?;
    let signer = CaSigner::from_pem(&material.cert_pem, &material.key_pem)?;

    info!(
        "loaded signer {:?}",
        signer
            .cert()
            .subject_name()
            .entries()
            .filter_map(|e| e.data().to_string().ok())
            .collect::<Vec<_>>()
    );
    Ok(signer)
}
