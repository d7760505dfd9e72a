// src/cert/issuer.rs
use chrono::{DateTime, Duration, Utc};
use openssl::{
    asn1::Asn1Time,
    bn::BigNum,
    error::ErrorStack,
    hash::MessageDigest,
    nid::Nid,
    rand::rand_bytes,
    x509::{
        extension::{AuthorityKeyIdentifier, ExtendedKeyUsage},
        X509Builder, X509NameBuilder, X509Ref,
    },
};
use tracing::debug;

use super::types::{IssuedCertificate, SubjectConfig, SubjectTemplate};
use super::IssueError;
use crate::keys::{Fingerprint, KeyMaterial};
use crate::signer::CaSigner;

/// Leaf lifetime. Not configurable.
pub const VALIDITY_HOURS: i64 = 24;
/// Backdating to tolerate clock skew between us and the API server.
pub const BACKDATE_HOURS: i64 = 1;

pub struct CertificateIssuer<'a> {
    signer: &'a CaSigner,
    subject: &'a SubjectConfig,
}

impl<'a> CertificateIssuer<'a> {
    pub fn new(signer: &'a CaSigner, subject: &'a SubjectConfig) -> Self {
        Self { signer, subject }
    }

    /// Generates a client certificate for `sign_key` carrying the identity
    /// key fingerprint and group in its subject.
    pub fn issue(
        &self,
        fingerprint: &Fingerprint,
        sign_key: &KeyMaterial,
        group: &str,
    ) -> Result<IssuedCertificate, IssueError> {
        self.issue_at(fingerprint, sign_key, group, Utc::now())
    }

    pub fn issue_at(
        &self,
        fingerprint: &Fingerprint,
        sign_key: &KeyMaterial,
        group: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedCertificate, IssueError> {
        let subject = SubjectTemplate::new(fingerprint, group, self.subject);
        let not_before = now - Duration::hours(BACKDATE_HOURS);
        let not_after = now + Duration::hours(VALIDITY_HOURS);

        let serial_bytes = serial_number(now).map_err(template_error)?;
        let serial = BigNum::from_slice(&serial_bytes).map_err(template_error)?;
        let public_key = sign_key.to_pkey().map_err(template_error)?;
        let ca = self.signer.cert();

        let mut name = X509NameBuilder::new().map_err(template_error)?;
        for org in &subject.organization {
            name.append_entry_by_nid(Nid::ORGANIZATIONNAME, org)
                .map_err(template_error)?;
        }
        name.append_entry_by_nid(Nid::ORGANIZATIONALUNITNAME, &subject.organizational_unit)
            .map_err(template_error)?;
        name.append_entry_by_nid(Nid::COMMONNAME, &subject.common_name)
            .map_err(template_error)?;
        let name = name.build();

        let mut builder = X509Builder::new().map_err(template_error)?;
        builder.set_version(2).map_err(template_error)?;
        let asn1_serial = serial.to_asn1_integer().map_err(template_error)?;
        builder
            .set_serial_number(&asn1_serial)
            .map_err(template_error)?;
        builder.set_subject_name(&name).map_err(template_error)?;
        builder
            .set_issuer_name(ca.subject_name())
            .map_err(template_error)?;
        builder.set_pubkey(&public_key).map_err(template_error)?;
        let asn1_not_before = Asn1Time::from_unix(not_before.timestamp()).map_err(template_error)?;
        builder
            .set_not_before(&asn1_not_before)
            .map_err(template_error)?;
        let asn1_not_after = Asn1Time::from_unix(not_after.timestamp()).map_err(template_error)?;
        builder
            .set_not_after(&asn1_not_after)
            .map_err(template_error)?;
        builder
            .append_extension(
                ExtendedKeyUsage::new()
                    .client_auth()
                    .build()
                    .map_err(template_error)?,
            )
            .map_err(template_error)?;
        let authority_key_id = AuthorityKeyIdentifier::new()
            .keyid(false)
            .build(&builder.x509v3_context(Some(ca), None))
            .map_err(template_error)?;
        builder
            .append_extension(authority_key_id)
            .map_err(template_error)?;

        let digest = inherited_digest(ca)?;
        builder
            .sign(self.signer.key(), digest)
            .map_err(|e| IssueError::Signing(e.to_string()))?;

        let der = builder
            .build()
            .to_der()
            .map_err(|e| IssueError::Signing(e.to_string()))?;
        let serial = hex::encode(serial_bytes);

        debug!("signed certificate serial {} for group {}", serial, group);

        Ok(IssuedCertificate {
            der,
            subject,
            serial,
            not_before,
            not_after,
        })
    }
}

/// Issuance time in nanoseconds followed by 64 random bits.
fn serial_number(now: DateTime<Utc>) -> Result<[u8; 16], ErrorStack> {
    let nanos = now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp()) as u64;
    let mut serial = [0u8; 16];
    serial[..8].copy_from_slice(&nanos.to_be_bytes());
    rand_bytes(&mut serial[8..])?;
    Ok(serial)
}

/// The digest the CA itself was signed with, so the algorithm choice lives
/// with the CA material rather than with the request.
fn inherited_digest(ca: &X509Ref) -> Result<MessageDigest, IssueError> {
    let nid = ca.signature_algorithm().object().nid();
    let algorithms = nid.signature_algorithms().ok_or_else(|| {
        IssueError::Template(format!(
            "unknown CA signature algorithm {}",
            nid.long_name().unwrap_or("?")
        ))
    })?;

    // Ed25519 and Ed448 sign the message directly
    if algorithms.digest == Nid::UNDEF {
        return Ok(MessageDigest::null());
    }

    MessageDigest::from_nid(algorithms.digest).ok_or_else(|| {
        IssueError::Template(format!(
            "unsupported CA digest {}",
            algorithms.digest.long_name().unwrap_or("?")
        ))
    })
}

fn template_error(e: ErrorStack) -> IssueError {
    IssueError::Template(e.to_string())
}
