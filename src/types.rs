// types.rs
use clap::Parser;
use std::path::PathBuf;

use crate::authz::AuthorizedSource;

#[derive(Parser, Debug)]
#[command(author, version, about = "Issue a short-lived client certificate for a proven SSH identity", long_about = None)]
pub struct Args {
    /// The public identity key to verify (SSH format). Required.
    #[arg(long = "id-key", env = "SIGNKEY_ID_KEY", default_value = "")]
    pub id_key: String,

    /// Base64 of a PEM public key to certify instead of a generated keypair.
    #[arg(long = "sign-key", env = "SIGNKEY_SIGN_KEY", default_value = "")]
    pub sign_key: String,

    /// Issuer configuration file; built-in defaults when absent
    #[arg(short, long)]
    pub config: Option<String>,

    /// Read the signer secret through this kubeconfig instead of in-cluster
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Authorized keys file and its group, PATH=GROUP. Repeatable.
    #[arg(long = "auth-keys", value_parser = parse_auth_keys)]
    pub auth_keys: Vec<AuthorizedSource>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

fn parse_auth_keys(arg: &str) -> Result<AuthorizedSource, String> {
    match arg.rsplit_once('=') {
        Some((path, group)) if !path.is_empty() && !group.is_empty() => Ok(AuthorizedSource {
            path: path.to_string(),
            group: group.to_string(),
        }),
        _ => Err(format!("expected PATH=GROUP, got {:?}", arg)),
    }
}

/// One issuance request, exactly as the caller supplied it.
#[derive(Debug, Clone)]
pub struct SignRequest {
    /// One line of SSH public key text.
    pub identity_key: String,
    /// Base64 PEM; empty means none.
    pub sign_key: String,
}

impl From<&Args> for SignRequest {
    fn from(args: &Args) -> Self {
        Self {
            identity_key: args.id_key.clone(),
            sign_key: args.sign_key.clone(),
        }
    }
}
