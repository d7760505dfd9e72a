// src/keys/sign_key.rs
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use openssl::{pkey::PKey, rsa::Rsa};

use super::{KeyError, KeyMaterial};

// Callers usually strip the padding to keep the argument on one line; accept both.
const SIGN_KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Extract a public key from a single-line base64-encoded PEM block.
///
/// Accepts `RSA PUBLIC KEY` (PKCS#1) and `PUBLIC KEY` (PKIX: RSA, DSA,
/// ECDSA, Ed25519). An empty argument means no sign key was supplied.
pub fn parse_sign_key(arg: &str) -> Result<Option<KeyMaterial>, KeyError> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Ok(None);
    }

    let data = SIGN_KEY_ENGINE
        .decode(arg)
        .map_err(|e| KeyError::SignKeyDecode(e.to_string()))?;

    let block = pem::parse(&data).map_err(|_| KeyError::SignKeyEncoding)?;

    let pkey = match block.tag() {
        "RSA PUBLIC KEY" => Rsa::public_key_from_der_pkcs1(block.contents())
            .and_then(PKey::from_rsa)
            .map_err(|e| KeyError::BadSignKey(e.to_string()))?,
        "PUBLIC KEY" => PKey::public_key_from_der(block.contents())
            .map_err(|e| KeyError::BadSignKey(e.to_string()))?,
        other => return Err(KeyError::UnexpectedPemType(other.to_string())),
    };

    KeyMaterial::from_pkey(&pkey).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use base64::engine::general_purpose;

    #[test]
    fn test_empty_means_absent() {
        assert!(parse_sign_key("").unwrap().is_none());
    }

    #[test]
    fn test_pkix_ed25519() {
        let (pkey, _) = testing::ed25519_identity("a");
        let arg = testing::sign_key_arg(&pkey.public_key_to_pem().unwrap());
        let material = parse_sign_key(&arg).unwrap().unwrap();
        assert_eq!(material, KeyMaterial::from_pkey(&pkey).unwrap());
    }

    #[test]
    fn test_pkcs1_rsa_with_padding() {
        let (pkey, _) = testing::rsa_identity("b");
        let pem = pkey.rsa().unwrap().public_key_to_pem_pkcs1().unwrap();
        let arg = general_purpose::STANDARD.encode(&pem);
        let material = parse_sign_key(&arg).unwrap().unwrap();
        assert_eq!(material.algorithm(), "rsa");
    }

    #[test]
    fn test_not_base64() {
        assert!(matches!(
            parse_sign_key("%%%"),
            Err(KeyError::SignKeyDecode(_))
        ));
    }

    #[test]
    fn test_not_pem() {
        let arg = general_purpose::STANDARD_NO_PAD.encode(b"just some bytes");
        assert!(matches!(parse_sign_key(&arg), Err(KeyError::SignKeyEncoding)));
    }

    #[test]
    fn test_wrong_block_type() {
        let (pkey, _) = testing::ed25519_identity("a");
        let pem = pkey.private_key_to_pem_pkcs8().unwrap();
        let arg = testing::sign_key_arg(&pem);
        assert!(matches!(
            parse_sign_key(&arg),
            Err(KeyError::UnexpectedPemType(t)) if t == "PRIVATE KEY"
        ));
    }
}
