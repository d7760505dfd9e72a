// src/signer/audit.rs
use crate::keys::Fingerprint;

/// Who is asking, for correlation in the credential store's audit log.
#[derive(Debug, Clone)]
pub struct AuditContext {
    pub hostname: String,
    pub pid: u32,
    pub fingerprint: Fingerprint,
}

impl AuditContext {
    pub fn capture(fingerprint: Fingerprint) -> Self {
        let hostname = gethostname::gethostname()
            .into_string()
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            hostname,
            pid: std::process::id(),
            fingerprint,
        }
    }

    pub fn user_agent(&self) -> String {
        format!(
            "signkey/{} (pod: {}; pid: {}; fp: {})",
            env!("CARGO_PKG_VERSION"),
            self.hostname,
            self.pid,
            self.fingerprint.to_base64()
        )
    }
}
