use tracing::{debug, info};

use crate::authz::AuthorizationTable;
use crate::cert::{encode_output, CertificateIssuer, IssuedCertificate};
use crate::config::IssuerConfig;
use crate::error::Error;
use crate::keys::{generate_keypair, parse_sign_key, IdentityKey};
use crate::signer::{load_signer, AuditContext, CredentialStore};
use crate::types::SignRequest;
use crate::verify::{IdentityVerifier, VerificationMethod};

/// Result of one successful request.
#[derive(Debug)]
pub struct Issuance {
    pub method: VerificationMethod,
    pub group: String,
    pub certificate: IssuedCertificate,
    /// Exactly what goes to stdout.
    pub output: String,
}

/// Verify, authorize, and certify one request. Nothing is written anywhere;
/// the caller emits `output` only when this returns `Ok`.
pub async fn run_request(
    request: &SignRequest,
    config: &IssuerConfig,
    table: &AuthorizationTable,
    verifier: &IdentityVerifier,
    store: &mut dyn CredentialStore,
) -> Result<Issuance, Error> {
    let identity = IdentityKey::parse(&request.identity_key)?;
    let sign_key = parse_sign_key(&request.sign_key)?;
    let fingerprint = identity.fingerprint();
    debug!("request for identity key {} ({})", fingerprint, identity.comment());

    let verification = verifier.verify(&identity, sign_key).await?;
    let group = table.resolve(&fingerprint)?.to_string();
    info!("identity key {} authorized for group {}", fingerprint, group);

    let (sign_key, keypair) = match verification.sign_key {
        Some(key) => (key, None),
        None => {
            let keypair = generate_keypair()?;
            info!("generated {} keypair", keypair.public().algorithm());
            (keypair.public().clone(), Some(keypair))
        }
    };

    let audit = AuditContext::capture(fingerprint);
    let signer = load_signer(store, &config.signer, &audit).await?;

    let certificate =
        CertificateIssuer::new(&signer, &config.subject).issue(&fingerprint, &sign_key, &group)?;
    let output = encode_output(keypair.as_ref(), &certificate);

    Ok(Issuance {
        method: verification.method,
        group,
        certificate,
        output,
    })
}
