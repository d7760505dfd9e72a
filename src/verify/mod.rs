//! Proof that the caller controls the identity key.
//!
//! With an agent endpoint present the agent is asked to sign a random
//! challenge with the identity key. Without one, the only thing that can be
//! issued is a certificate for the identity key itself.

use openssl::rand::rand_bytes;
use signature::Verifier;
use ssh_key::{Algorithm, PublicKey, Signature};
use std::env;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use crate::agent::{protocol::SSH_AGENT_RSA_SHA2_256, AgentClient, AgentError, SigningAgent};
use crate::keys::{IdentityKey, KeyMaterial};

pub const AGENT_SOCKET_ENV: &str = "SSH_AUTH_SOCK";

const CHALLENGE_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("couldn't connect to agent: {0}")]
    AgentUnreachable(String),

    #[error("couldn't verify key: {0}")]
    AgentRefused(String),

    #[error("identity key not held by agent")]
    NotHeldByAgent,

    #[error("unable to generate challenge: {0}")]
    Challenge(String),

    #[error("signature invalid: {0}")]
    InvalidSignature(String),

    #[error("no verification path available: {0}")]
    NoVerificationPath(String),
}

impl From<AgentError> for VerifyError {
    fn from(error: AgentError) -> Self {
        match error {
            AgentError::Connect(e) => VerifyError::AgentUnreachable(e),
            other => VerifyError::AgentRefused(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMethod {
    /// The agent signed a fresh challenge with the identity key.
    Agent,
    /// No agent; the supplied sign key is the identity key.
    KeyEquality,
    /// No agent and no sign key; the identity key is adopted.
    Adopted,
}

#[derive(Debug, Clone)]
pub struct Verification {
    pub method: VerificationMethod,
    /// Key to certify. `None` means a keypair must be provisioned.
    pub sign_key: Option<KeyMaterial>,
}

pub struct IdentityVerifier {
    agent_socket: Option<PathBuf>,
}

impl IdentityVerifier {
    pub fn new(agent_socket: Option<PathBuf>) -> Self {
        Self { agent_socket }
    }

    pub fn from_env() -> Self {
        Self::new(env::var_os(AGENT_SOCKET_ENV).map(PathBuf::from))
    }

    pub async fn verify(
        &self,
        identity: &IdentityKey,
        sign_key: Option<KeyMaterial>,
    ) -> Result<Verification, VerifyError> {
        match &self.agent_socket {
            Some(path) => {
                let mut agent = AgentClient::connect(path).await?;
                verify_with_agent(&mut agent, identity, sign_key).await
            }
            None => verify_by_equality(identity, sign_key),
        }
    }
}

pub async fn verify_with_agent<A: SigningAgent + ?Sized>(
    agent: &mut A,
    identity: &IdentityKey,
    sign_key: Option<KeyMaterial>,
) -> Result<Verification, VerifyError> {
    let blob = identity
        .wire()
        .map_err(|e| VerifyError::AgentRefused(e.to_string()))?;

    let held = agent.identities().await?;
    debug!("agent holds {} identities", held.len());
    if !held.iter().any(|id| id.key_blob == blob) {
        return Err(VerifyError::NotHeldByAgent);
    }

    let mut challenge = [0u8; CHALLENGE_LEN];
    rand_bytes(&mut challenge).map_err(|e| VerifyError::Challenge(e.to_string()))?;

    let flags = match identity.public_key().algorithm() {
        Algorithm::Rsa { .. } => SSH_AGENT_RSA_SHA2_256,
        _ => 0,
    };
    let signature = agent.sign(&blob, &challenge, flags).await?;

    <PublicKey as Verifier<Signature>>::verify(identity.public_key(), &challenge, &signature)
        .map_err(|e| VerifyError::InvalidSignature(e.to_string()))?;

    info!("identity key {} verified by agent", identity.fingerprint());
    Ok(Verification {
        method: VerificationMethod::Agent,
        sign_key,
    })
}

/// Without an agent only self-certification is allowed: an absent sign key
/// adopts the identity key, a supplied one must be the identity key.
pub fn verify_by_equality(
    identity: &IdentityKey,
    sign_key: Option<KeyMaterial>,
) -> Result<Verification, VerifyError> {
    let material = identity
        .material()
        .map_err(|e| VerifyError::NoVerificationPath(format!("{} without an agent", e)))?;

    let sign_key = match sign_key {
        None => {
            info!("no agent and no sign key, certifying identity key {}", identity.fingerprint());
            return Ok(Verification {
                method: VerificationMethod::Adopted,
                sign_key: Some(material),
            });
        }
        Some(key) => key,
    };

    match &sign_key {
        KeyMaterial::Rsa { .. } | KeyMaterial::Ed25519(_) => {}
        other => {
            return Err(VerifyError::NoVerificationPath(format!(
                "unsupported sign key type {}",
                other.algorithm()
            )))
        }
    }

    if sign_key != material {
        return Err(VerifyError::NoVerificationPath(
            "sign key differs from identity key and no agent is available".to_string(),
        ));
    }

    info!("sign key matches identity key {}", identity.fingerprint());
    Ok(Verification {
        method: VerificationMethod::KeyEquality,
        sign_key: Some(sign_key),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentIdentity;
    use crate::testing;
    use async_trait::async_trait;
    use openssl::ecdsa::EcdsaSig;
    use openssl::hash::MessageDigest;
    use openssl::pkey::{Id, PKey, Private};
    use openssl::sign::Signer;
    use ssh_key::{EcdsaCurve, HashAlg, Mpint};

    enum Behavior {
        Honest,
        Corrupt,
        Substitute(PKey<Private>),
        Refuse,
        /// RSA only: hash with SHA-512 but label the result rsa-sha2-256.
        WrongHash,
    }

    struct MockAgent {
        key: PKey<Private>,
        blob: Vec<u8>,
        behavior: Behavior,
        last_flags: Option<u32>,
    }

    impl MockAgent {
        fn new(key: PKey<Private>, identity: &IdentityKey, behavior: Behavior) -> Self {
            Self {
                key,
                blob: identity.wire().unwrap(),
                behavior,
                last_flags: None,
            }
        }
    }

    /// Signature bytes in SSH layout. ECDSA keys are assumed to be P-521.
    fn raw_sign(key: &PKey<Private>, digest: MessageDigest, data: &[u8]) -> Vec<u8> {
        match key.id() {
            Id::RSA => Signer::new(digest, key).unwrap().sign_oneshot_to_vec(data).unwrap(),
            Id::EC => {
                let der = Signer::new(MessageDigest::sha512(), key)
                    .unwrap()
                    .sign_oneshot_to_vec(data)
                    .unwrap();
                let sig = EcdsaSig::from_der(&der).unwrap();
                let mut out = Vec::new();
                for part in [sig.r(), sig.s()] {
                    let mpint = Mpint::from_positive_bytes(&part.to_vec()).unwrap();
                    out.extend_from_slice(&(mpint.as_bytes().len() as u32).to_be_bytes());
                    out.extend_from_slice(mpint.as_bytes());
                }
                out
            }
            _ => Signer::new_without_digest(key).unwrap().sign_oneshot_to_vec(data).unwrap(),
        }
    }

    fn algorithm_of(key: &PKey<Private>) -> Algorithm {
        match key.id() {
            Id::RSA => Algorithm::Rsa {
                hash: Some(HashAlg::Sha256),
            },
            Id::EC => Algorithm::Ecdsa {
                curve: EcdsaCurve::NistP521,
            },
            _ => Algorithm::Ed25519,
        }
    }

    #[async_trait]
    impl SigningAgent for MockAgent {
        async fn identities(&mut self) -> Result<Vec<AgentIdentity>, AgentError> {
            Ok(vec![AgentIdentity {
                key_blob: self.blob.clone(),
                comment: "mock".to_string(),
            }])
        }

        async fn sign(&mut self, _blob: &[u8], data: &[u8], flags: u32) -> Result<Signature, AgentError> {
            self.last_flags = Some(flags);
            let sha256 = MessageDigest::sha256();
            let sig = match &self.behavior {
                Behavior::Honest => raw_sign(&self.key, sha256, data),
                Behavior::Corrupt => {
                    let mut sig = raw_sign(&self.key, sha256, data);
                    sig[0] ^= 0xff;
                    sig
                }
                Behavior::Substitute(other) => raw_sign(other, sha256, data),
                Behavior::Refuse => return Err(AgentError::Refused),
                Behavior::WrongHash => raw_sign(&self.key, MessageDigest::sha512(), data),
            };
            Ok(Signature::new(algorithm_of(&self.key), sig).unwrap())
        }
    }

    fn ed25519() -> (PKey<Private>, IdentityKey) {
        let (key, line) = testing::ed25519_identity("alice@host");
        (key, IdentityKey::parse(&line).unwrap())
    }

    #[tokio::test]
    async fn test_agent_valid_signature() {
        let (key, identity) = ed25519();
        let mut agent = MockAgent::new(key, &identity, Behavior::Honest);
        let verification = verify_with_agent(&mut agent, &identity, None).await.unwrap();
        assert_eq!(verification.method, VerificationMethod::Agent);
        assert!(verification.sign_key.is_none());
    }

    #[tokio::test]
    async fn test_agent_ed25519_sends_no_flags() {
        let (key, identity) = ed25519();
        let mut agent = MockAgent::new(key, &identity, Behavior::Honest);
        verify_with_agent(&mut agent, &identity, None).await.unwrap();
        assert_eq!(agent.last_flags, Some(0));
    }

    #[tokio::test]
    async fn test_agent_rsa_requests_sha256() {
        let (key, line) = testing::rsa_identity("bob@host");
        let identity = IdentityKey::parse(&line).unwrap();
        let mut agent = MockAgent::new(key, &identity, Behavior::Honest);

        let verification = verify_with_agent(&mut agent, &identity, None).await.unwrap();
        assert_eq!(verification.method, VerificationMethod::Agent);
        assert_eq!(agent.last_flags, Some(SSH_AGENT_RSA_SHA2_256));
        assert_eq!(SSH_AGENT_RSA_SHA2_256, 2);
    }

    #[tokio::test]
    async fn test_agent_rsa_wrong_hash_rejected() {
        let (key, line) = testing::rsa_identity("bob@host");
        let identity = IdentityKey::parse(&line).unwrap();
        let mut agent = MockAgent::new(key, &identity, Behavior::WrongHash);

        let result = verify_with_agent(&mut agent, &identity, None).await;
        assert!(matches!(result, Err(VerifyError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn test_agent_p521_signature() {
        let (key, line) = testing::p521_identity("carol@host");
        let identity = IdentityKey::parse(&line).unwrap();
        let mut agent = MockAgent::new(key, &identity, Behavior::Honest);

        let verification = verify_with_agent(&mut agent, &identity, None).await.unwrap();
        assert_eq!(verification.method, VerificationMethod::Agent);
        assert_eq!(agent.last_flags, Some(0));
    }

    #[tokio::test]
    async fn test_agent_keeps_supplied_sign_key() {
        let (key, identity) = ed25519();
        let (other, _) = testing::rsa_identity("x");
        let sign_key = KeyMaterial::from_pkey(&other).unwrap();
        let mut agent = MockAgent::new(key, &identity, Behavior::Honest);
        let verification = verify_with_agent(&mut agent, &identity, Some(sign_key.clone()))
            .await
            .unwrap();
        assert_eq!(verification.sign_key, Some(sign_key));
    }

    #[tokio::test]
    async fn test_agent_corrupted_signature() {
        let (key, identity) = ed25519();
        let mut agent = MockAgent::new(key, &identity, Behavior::Corrupt);
        let result = verify_with_agent(&mut agent, &identity, None).await;
        assert!(matches!(result, Err(VerifyError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn test_agent_substituted_signature() {
        let (key, identity) = ed25519();
        let (impostor, _) = testing::ed25519_identity("mallory@host");
        let mut agent = MockAgent::new(key, &identity, Behavior::Substitute(impostor));
        let result = verify_with_agent(&mut agent, &identity, None).await;
        assert!(matches!(result, Err(VerifyError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn test_agent_refusal() {
        let (key, identity) = ed25519();
        let mut agent = MockAgent::new(key, &identity, Behavior::Refuse);
        let result = verify_with_agent(&mut agent, &identity, None).await;
        assert!(matches!(result, Err(VerifyError::AgentRefused(_))));
    }

    #[tokio::test]
    async fn test_agent_without_identity() {
        let (key, identity) = ed25519();
        let (_, other_line) = testing::ed25519_identity("bob@host");
        let other = IdentityKey::parse(&other_line).unwrap();
        let mut agent = MockAgent::new(key, &other, Behavior::Honest);
        let result = verify_with_agent(&mut agent, &identity, None).await;
        assert!(matches!(result, Err(VerifyError::NotHeldByAgent)));
    }

    #[tokio::test]
    async fn test_unreachable_agent() {
        let dir = tempfile::TempDir::new().unwrap();
        let verifier = IdentityVerifier::new(Some(dir.path().join("missing.sock")));
        let (_, identity) = ed25519();
        let result = verifier.verify(&identity, None).await;
        assert!(matches!(result, Err(VerifyError::AgentUnreachable(_))));
    }

    #[test]
    fn test_no_agent_no_sign_key_adopts_identity() {
        let (_, identity) = ed25519();
        let verification = verify_by_equality(&identity, None).unwrap();
        assert_eq!(verification.method, VerificationMethod::Adopted);
        assert_eq!(verification.sign_key, Some(identity.material().unwrap()));
    }

    #[test]
    fn test_no_agent_equal_sign_key() {
        let (key, identity) = ed25519();
        let sign_key = KeyMaterial::from_pkey(&key).unwrap();
        let verification = verify_by_equality(&identity, Some(sign_key)).unwrap();
        assert_eq!(verification.method, VerificationMethod::KeyEquality);
    }

    #[test]
    fn test_no_agent_equal_rsa_sign_key() {
        let (key, line) = testing::rsa_identity("bob@host");
        let identity = IdentityKey::parse(&line).unwrap();
        let sign_key = KeyMaterial::from_pkey(&key).unwrap();
        assert!(verify_by_equality(&identity, Some(sign_key)).is_ok());
    }

    #[test]
    fn test_no_agent_unequal_sign_key() {
        let (_, identity) = ed25519();
        let (rsa, _) = testing::rsa_identity("bob@host");
        let sign_key = KeyMaterial::from_pkey(&rsa).unwrap();
        let err = verify_by_equality(&identity, Some(sign_key)).unwrap_err();
        assert!(err.to_string().contains("no verification path available"));
    }

    #[test]
    fn test_no_agent_security_key_identity() {
        let identity = IdentityKey::parse(&testing::sk_ed25519_identity("user@yubikey")).unwrap();
        let err = verify_by_equality(&identity, None).unwrap_err();
        assert!(matches!(err, VerifyError::NoVerificationPath(_)));
    }

    #[test]
    fn test_no_agent_unsupported_sign_key() {
        let (_, identity) = ed25519();
        let group = openssl::ec::EcGroup::from_curve_name(openssl::nid::Nid::X9_62_PRIME256V1).unwrap();
        let ec = PKey::from_ec_key(openssl::ec::EcKey::generate(&group).unwrap()).unwrap();
        let sign_key = KeyMaterial::from_pkey(&ec).unwrap();
        let err = verify_by_equality(&identity, Some(sign_key)).unwrap_err();
        assert!(matches!(err, VerifyError::NoVerificationPath(_)));
    }
}
