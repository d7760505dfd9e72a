// src/cert/output.rs
use pem::{EncodeConfig, LineEnding, Pem};
use std::io::{self, Write};

use super::types::IssuedCertificate;
use crate::keys::EphemeralKeypair;

/// The PEM text for stdout: the generated private key if there is one,
/// then the certificate. Built whole so a failure never leaves partial output.
pub fn encode_output(keypair: Option<&EphemeralKeypair>, cert: &IssuedCertificate) -> String {
    let config = EncodeConfig::new().set_line_ending(LineEnding::LF);
    let mut out = String::new();

    if let Some(keypair) = keypair {
        let block = Pem::new("PRIVATE KEY", keypair.private_pkcs8().to_vec());
        out.push_str(&pem::encode_config(&block, config));
    }

    let block = Pem::new("CERTIFICATE", cert.der.clone());
    out.push_str(&pem::encode_config(&block, config));
    out
}

pub fn write_output<W: Write>(writer: &mut W, output: &str) -> io::Result<()> {
    writer.write_all(output.as_bytes())?;
    writer.flush()
}
