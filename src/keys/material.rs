// src/keys/material.rs
use openssl::{
    bn::{BigNum, BigNumContext},
    dsa::Dsa,
    ec::{EcGroup, EcKey, EcPoint, PointConversionForm},
    error::ErrorStack,
    nid::Nid,
    pkey::{HasPublic, Id, PKey, PKeyRef, Public},
    rsa::Rsa,
};
use ssh_key::{public::KeyData, EcdsaCurve, Mpint};

use super::KeyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    P256,
    P384,
    P521,
}

impl EcCurve {
    fn nid(self) -> Nid {
        match self {
            EcCurve::P256 => Nid::X9_62_PRIME256V1,
            EcCurve::P384 => Nid::SECP384R1,
            EcCurve::P521 => Nid::SECP521R1,
        }
    }

    fn from_nid(nid: Nid) -> Option<Self> {
        match nid {
            Nid::X9_62_PRIME256V1 => Some(EcCurve::P256),
            Nid::SECP384R1 => Some(EcCurve::P384),
            Nid::SECP521R1 => Some(EcCurve::P521),
            _ => None,
        }
    }
}

impl From<EcdsaCurve> for EcCurve {
    fn from(curve: EcdsaCurve) -> Self {
        match curve {
            EcdsaCurve::NistP256 => EcCurve::P256,
            EcdsaCurve::NistP384 => EcCurve::P384,
            EcdsaCurve::NistP521 => EcCurve::P521,
        }
    }
}

/// Public key material, one variant per supported algorithm family.
///
/// Integers are big-endian without leading zeros, so two keys are the same
/// key exactly when their `KeyMaterial` values are equal, whether they came
/// from SSH wire text or from PEM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    Rsa { n: Vec<u8>, e: Vec<u8> },
    Ed25519([u8; 32]),
    Ecdsa { curve: EcCurve, point: Vec<u8> },
    Dsa { p: Vec<u8>, q: Vec<u8>, g: Vec<u8>, y: Vec<u8> },
}

impl KeyMaterial {
    pub fn algorithm(&self) -> &'static str {
        match self {
            KeyMaterial::Rsa { .. } => "rsa",
            KeyMaterial::Ed25519(_) => "ed25519",
            KeyMaterial::Ecdsa { .. } => "ecdsa",
            KeyMaterial::Dsa { .. } => "dsa",
        }
    }

    pub fn from_ssh(key: &KeyData) -> Result<Self, KeyError> {
        match key {
            KeyData::Rsa(rsa) => Ok(KeyMaterial::Rsa {
                n: mpint_bytes(&rsa.n)?,
                e: mpint_bytes(&rsa.e)?,
            }),
            KeyData::Ed25519(ed) => Ok(KeyMaterial::Ed25519(ed.0)),
            KeyData::Ecdsa(ec) => Ok(KeyMaterial::Ecdsa {
                curve: ec.curve().into(),
                point: ec.as_sec1_bytes().to_vec(),
            }),
            KeyData::Dsa(dsa) => Ok(KeyMaterial::Dsa {
                p: mpint_bytes(&dsa.p)?,
                q: mpint_bytes(&dsa.q)?,
                g: mpint_bytes(&dsa.g)?,
                y: mpint_bytes(&dsa.y)?,
            }),
            other => Err(KeyError::UnsupportedAlgorithm(other.algorithm().to_string())),
        }
    }

    pub fn from_pkey<T: HasPublic>(pkey: &PKeyRef<T>) -> Result<Self, KeyError> {
        let material = match pkey.id() {
            Id::RSA => {
                let rsa = pkey.rsa().map_err(bad_key)?;
                KeyMaterial::Rsa {
                    n: rsa.n().to_vec(),
                    e: rsa.e().to_vec(),
                }
            }
            Id::ED25519 => {
                let raw = pkey.raw_public_key().map_err(bad_key)?;
                let raw: [u8; 32] = raw
                    .try_into()
                    .map_err(|_| KeyError::BadSignKey("ed25519 key is not 32 bytes".to_string()))?;
                KeyMaterial::Ed25519(raw)
            }
            Id::EC => {
                let ec = pkey.ec_key().map_err(bad_key)?;
                let group = ec.group();
                let curve = group
                    .curve_name()
                    .and_then(EcCurve::from_nid)
                    .ok_or_else(|| KeyError::UnsupportedAlgorithm("ecdsa curve".to_string()))?;
                let mut ctx = BigNumContext::new().map_err(bad_key)?;
                let point = ec
                    .public_key()
                    .to_bytes(group, PointConversionForm::UNCOMPRESSED, &mut ctx)
                    .map_err(bad_key)?;
                KeyMaterial::Ecdsa { curve, point }
            }
            Id::DSA => {
                let dsa = pkey.dsa().map_err(bad_key)?;
                KeyMaterial::Dsa {
                    p: dsa.p().to_vec(),
                    q: dsa.q().to_vec(),
                    g: dsa.g().to_vec(),
                    y: dsa.pub_key().to_vec(),
                }
            }
            other => {
                return Err(KeyError::UnsupportedAlgorithm(format!(
                    "openssl key id {}",
                    other.as_raw()
                )))
            }
        };
        Ok(material)
    }

    /// Rebuild an openssl public key for embedding into a certificate.
    pub fn to_pkey(&self) -> Result<PKey<Public>, ErrorStack> {
        match self {
            KeyMaterial::Rsa { n, e } => {
                let rsa = Rsa::from_public_components(BigNum::from_slice(n)?, BigNum::from_slice(e)?)?;
                PKey::from_rsa(rsa)
            }
            KeyMaterial::Ed25519(raw) => PKey::public_key_from_raw_bytes(raw, Id::ED25519),
            KeyMaterial::Ecdsa { curve, point } => {
                let group = EcGroup::from_curve_name(curve.nid())?;
                let mut ctx = BigNumContext::new()?;
                let point = EcPoint::from_bytes(&group, point, &mut ctx)?;
                PKey::from_ec_key(EcKey::from_public_key(&group, &point)?)
            }
            KeyMaterial::Dsa { p, q, g, y } => {
                let dsa = Dsa::from_public_components(
                    BigNum::from_slice(p)?,
                    BigNum::from_slice(q)?,
                    BigNum::from_slice(g)?,
                    BigNum::from_slice(y)?,
                )?;
                PKey::from_dsa(dsa)
            }
        }
    }
}

fn mpint_bytes(value: &Mpint) -> Result<Vec<u8>, KeyError> {
    value
        .as_positive_bytes()
        .map(|b| b.to_vec())
        .ok_or_else(|| KeyError::BadIdentityKey("negative integer in key".to_string()))
}

fn bad_key(e: ErrorStack) -> KeyError {
    KeyError::BadSignKey(e.to_string())
}
