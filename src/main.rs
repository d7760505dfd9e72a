// src/main.rs
mod agent;
mod app;
mod authz;
mod cert;
mod config;
mod error;
mod keys;
mod kubeconfig;
mod signer;
mod types;
mod utils;
mod verify;

#[cfg(test)]
mod testing;

use authz::AuthorizationTable;
use clap::Parser;
use config::IssuerConfig;
use error::Error;
use std::{io, process::ExitCode};
use tracing::{debug, error, info, warn};
use types::{Args, SignRequest};
use verify::IdentityVerifier;

fn load_config(args: &Args) -> Result<IssuerConfig, Error> {
    let mut config = match &args.config {
        Some(path) => IssuerConfig::load_from_file(path)
            .map_err(|e| Error::Config(format!("{}: {}", path, e)))?,
        None => IssuerConfig::default(),
    };

    if !args.auth_keys.is_empty() {
        config.authorized_keys = args.auth_keys.clone();
    }

    config.validate().map_err(|e| Error::Config(e.to_string()))?;
    Ok(config)
}

async fn run(args: Args) -> Result<String, Error> {
    let config = load_config(&args)?;
    debug!("authorized key sources: {:?}", config.authorized_keys);

    let table = AuthorizationTable::build(&config.authorized_keys, config.duplicate_policy)?;
    if table.is_empty() {
        warn!("no authorized keys loaded, every request will be refused");
    } else {
        info!("{} authorized keys loaded", table.len());
    }

    let verifier = IdentityVerifier::from_env();
    let mut store = signer::store_from_config(&config.store, args.kubeconfig.clone());

    let request = SignRequest::from(&args);
    let issuance = app::run_request(&request, &config, &table, &verifier, store.as_mut()).await?;

    let cert = &issuance.certificate;
    info!(
        "issued {} ({:?} proof, group {}) serial {} valid {} to {}",
        cert.subject.common_name,
        issuance.method,
        issuance.group,
        cert.serial,
        cert.not_before,
        cert.not_after
    );
    Ok(issuance.output)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    utils::logging::init(args.debug);

    let output = match run(args).await {
        Ok(output) => output,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    if let Err(e) = cert::write_output(&mut io::stdout().lock(), &output) {
        eprintln!("Error: couldn't write output: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
