// src/cert/mod.rs
mod issuer;
mod output;
mod types;

pub use issuer::CertificateIssuer;
pub use output::{encode_output, write_output};
pub use types::{IssuedCertificate, SubjectConfig};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("error building certificate template: {0}")]
    Template(String),

    #[error("error creating cert: {0}")]
    Signing(String),
}
