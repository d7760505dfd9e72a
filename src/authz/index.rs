// src/authz/index.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::AuthzError;
use crate::keys::{Fingerprint, IdentityKey};

/// One authorized_keys file and the group its members belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizedSource {
    pub path: String,
    pub group: String,
}

impl AuthorizedSource {
    /// The path with `$VAR` / `${VAR}` / `~` expanded.
    pub fn expanded_path(&self) -> Result<PathBuf, String> {
        shellexpand::full(&self.path)
            .map(|p| PathBuf::from(p.as_ref()))
            .map_err(|e| e.to_string())
    }
}

/// What to do when the same key appears in sources for different groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Later sources (in configuration order) win.
    #[default]
    Overwrite,
    /// Refuse to build the table.
    Reject,
}

/// Fingerprint → group lookup, built once at startup and read-only after.
#[derive(Debug, Default)]
pub struct AuthorizationTable {
    entries: HashMap<Fingerprint, String>,
}

impl AuthorizationTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Read every source in order. Unreadable files and unparsable lines are
    /// reported and skipped, never fatal.
    pub fn build(sources: &[AuthorizedSource], policy: DuplicatePolicy) -> Result<Self, AuthzError> {
        let mut table = Self::new();

        for source in sources {
            let path = match source.expanded_path() {
                Ok(path) => path,
                Err(e) => {
                    warn!("couldn't expand authorized keys path {}: {}", source.path, e);
                    continue;
                }
            };

            let contents = match fs::read(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    warn!("error reading {}: {}", path.display(), e);
                    continue;
                }
            };

            let fingerprints = parse_authorized_keys(&contents, &path.display().to_string());
            debug!(
                "loaded {} keys for group {} from {}",
                fingerprints.len(),
                source.group,
                path.display()
            );

            for fingerprint in fingerprints {
                table.insert(fingerprint, &source.group, policy)?;
            }
        }

        Ok(table)
    }

    pub fn insert(
        &mut self,
        fingerprint: Fingerprint,
        group: &str,
        policy: DuplicatePolicy,
    ) -> Result<(), AuthzError> {
        if let Some(existing) = self.entries.get(&fingerprint) {
            if existing != group {
                if policy == DuplicatePolicy::Reject {
                    return Err(AuthzError::Conflict {
                        fingerprint: fingerprint.to_string(),
                        existing: existing.clone(),
                        group: group.to_string(),
                    });
                }
                warn!(
                    "key {} moves from group {} to {}",
                    fingerprint, existing, group
                );
            }
        }

        self.entries.insert(fingerprint, group.to_string());
        Ok(())
    }

    pub fn resolve(&self, fingerprint: &Fingerprint) -> Result<&str, AuthzError> {
        self.entries
            .get(fingerprint)
            .map(String::as_str)
            .ok_or_else(|| AuthzError::NotAuthorized(fingerprint.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fingerprints of every parsable key in an authorized_keys file. Lines are
/// decoded one at a time, so stray non-UTF-8 bytes only cost their own line.
pub fn parse_authorized_keys(contents: &[u8], origin: &str) -> Vec<Fingerprint> {
    let mut fingerprints = Vec::new();

    for (index, raw) in contents.split(|b| *b == b'\n').enumerate() {
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!("skipping line {} of {}: {}", index + 1, origin, e);
                continue;
            }
        };
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match IdentityKey::parse(line) {
            Ok(key) => fingerprints.push(key.fingerprint()),
            Err(e) => warn!(
                "couldn't parse key at line {} of {}: {}",
                index + 1,
                origin,
                e
            ),
        }
    }

    fingerprints
}
