// src/testing.rs
// Key and CA fixtures shared by the unit tests.
use base64::{engine::general_purpose, Engine as _};
use openssl::{
    asn1::Asn1Time,
    bn::{BigNum, BigNumContext},
    ec::{EcGroup, EcKey, PointConversionForm},
    hash::MessageDigest,
    nid::Nid,
    pkey::{PKey, Private},
    rsa::Rsa,
    x509::{extension::BasicConstraints, extension::SubjectKeyIdentifier, X509Builder, X509NameBuilder, X509},
};
use openssl::sign::Signer;
use ssh_key::{
    public::{EcdsaPublicKey, Ed25519PublicKey, KeyData, RsaPublicKey, SkEd25519},
    Mpint, PublicKey,
};
use tokio::net::UnixListener;

use crate::agent::protocol::{read_message, write_message, AgentIdentity, Request, Response};

/// A new Ed25519 key and its OpenSSH public key line.
pub fn ed25519_identity(comment: &str) -> (PKey<Private>, String) {
    let pkey = PKey::generate_ed25519().unwrap();
    let raw: [u8; 32] = pkey.raw_public_key().unwrap().try_into().unwrap();
    let key = PublicKey::new(KeyData::Ed25519(Ed25519PublicKey(raw)), comment);
    (pkey, key.to_openssh().unwrap())
}

/// OpenSSH line for a FIDO security key (sk-ssh-ed25519@openssh.com).
pub fn sk_ed25519_identity(comment: &str) -> String {
    let pkey = PKey::generate_ed25519().unwrap();
    let raw: [u8; 32] = pkey.raw_public_key().unwrap().try_into().unwrap();
    let data = KeyData::SkEd25519(SkEd25519::new(Ed25519PublicKey(raw), "ssh:"));
    PublicKey::new(data, comment).to_openssh().unwrap()
}

/// A new 2048-bit RSA key and its OpenSSH public key line.
pub fn rsa_identity(comment: &str) -> (PKey<Private>, String) {
    let rsa = Rsa::generate(2048).unwrap();
    let data = KeyData::Rsa(RsaPublicKey {
        e: Mpint::from_positive_bytes(&rsa.e().to_vec()).unwrap(),
        n: Mpint::from_positive_bytes(&rsa.n().to_vec()).unwrap(),
    });
    let key = PublicKey::new(data, comment);
    (PKey::from_rsa(rsa).unwrap(), key.to_openssh().unwrap())
}

/// A new ECDSA P-521 key and its OpenSSH public key line.
pub fn p521_identity(comment: &str) -> (PKey<Private>, String) {
    let group = EcGroup::from_curve_name(Nid::SECP521R1).unwrap();
    let ec = EcKey::generate(&group).unwrap();
    let mut ctx = BigNumContext::new().unwrap();
    let point = ec
        .public_key()
        .to_bytes(&group, PointConversionForm::UNCOMPRESSED, &mut ctx)
        .unwrap();
    let data = KeyData::Ecdsa(EcdsaPublicKey::from_sec1_bytes(&point).unwrap());
    let key = PublicKey::new(data, comment);
    (PKey::from_ec_key(ec).unwrap(), key.to_openssh().unwrap())
}

/// The sign-key argument format: unpadded base64 of a PEM block.
pub fn sign_key_arg(pem: &[u8]) -> String {
    general_purpose::STANDARD_NO_PAD.encode(pem)
}

/// A self-signed RSA CA signed with SHA-256.
pub fn test_ca() -> (X509, PKey<Private>) {
    let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, "kube-csr-signer_@1600000000")
        .unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(30).unwrap())
        .unwrap();
    builder
        .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
        .unwrap();
    let ski = SubjectKeyIdentifier::new()
        .build(&builder.x509v3_context(None, None))
        .unwrap();
    builder.append_extension(ski).unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();

    (builder.build(), key)
}

/// A self-signed Ed25519 CA.
pub fn test_ed25519_ca() -> (X509, PKey<Private>) {
    let key = PKey::generate_ed25519().unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, "ed25519-signer")
        .unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(2).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(30).unwrap())
        .unwrap();
    let ski = SubjectKeyIdentifier::new()
        .build(&builder.x509v3_context(None, None))
        .unwrap();
    builder.append_extension(ski).unwrap();
    builder.sign(&key, MessageDigest::null()).unwrap();

    (builder.build(), key)
}

/// PEM pair as a credential store would hold it; the key is PKCS#1.
pub fn test_ca_pem() -> (Vec<u8>, Vec<u8>) {
    let (cert, key) = test_ca();
    (
        cert.to_pem().unwrap(),
        key.rsa().unwrap().private_key_to_pem().unwrap(),
    )
}

/// Minimal agent holding one Ed25519 key, serving one connection until the
/// client hangs up.
pub async fn serve_agent(listener: UnixListener, key: PKey<Private>, blob: Vec<u8>) {
    let (mut stream, _) = listener.accept().await.unwrap();
    while let Ok(msg) = read_message(&mut stream).await {
        let response = match Request::decode(msg).unwrap() {
            Request::Identities => Response::Identities(vec![AgentIdentity {
                key_blob: blob.clone(),
                comment: "alice@host".to_string(),
            }]),
            Request::Sign { key_blob, data, .. } if key_blob == blob => {
                let mut signer = Signer::new_without_digest(&key).unwrap();
                Response::Signature {
                    algorithm: "ssh-ed25519".to_string(),
                    blob: signer.sign_oneshot_to_vec(&data).unwrap(),
                }
            }
            Request::Sign { .. } => Response::Failure,
        };
        write_message(&mut stream, &response.encode()).await.unwrap();
    }
}
