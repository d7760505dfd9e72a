// cert/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::keys::Fingerprint;

/// Marks certificates whose holder proved an SSH identity.
pub const PROOF_MARKER: &str = "system:authenticated:ssh";

/// Configurable parts of the issued subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectConfig {
    pub common_name_prefix: String,
    pub organizational_unit: String,
}

impl Default for SubjectConfig {
    fn default() -> Self {
        Self {
            common_name_prefix: "redhat-".to_string(),
            organizational_unit: "OpenShift Dedicated".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectTemplate {
    pub common_name: String,
    /// Always exactly: group, audit fingerprint, proof marker.
    pub organization: [String; 3],
    pub organizational_unit: String,
}

impl SubjectTemplate {
    pub fn new(fingerprint: &Fingerprint, group: &str, config: &SubjectConfig) -> Self {
        Self {
            common_name: format!(
                "{}{}-{}",
                config.common_name_prefix,
                group,
                fingerprint.short_base58()
            ),
            organization: [
                group.to_string(),
                // the full fingerprint ends up in the API server audit log
                fingerprint.audit_label(),
                PROOF_MARKER.to_string(),
            ],
            organizational_unit: config.organizational_unit.clone(),
        }
    }
}

/// A signed leaf certificate and what went into it.
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    pub der: Vec<u8>,
    pub subject: SubjectTemplate,
    pub serial: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}
