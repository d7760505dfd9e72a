// src/agent/client.rs
use async_trait::async_trait;
use ssh_key::{Algorithm, Signature};
use std::path::Path;
use tokio::net::UnixStream;
use tracing::debug;

use super::protocol::{read_message, write_message, AgentIdentity, Request, Response};
use super::{AgentError, SigningAgent};

/// Agent reached over a local Unix socket (usually `SSH_AUTH_SOCK`).
pub struct AgentClient {
    stream: UnixStream,
}

impl AgentClient {
    pub async fn connect(path: &Path) -> Result<Self, AgentError> {
        debug!("connecting to agent at {}", path.display());
        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| AgentError::Connect(format!("{}: {}", path.display(), e)))?;
        Ok(Self { stream })
    }

    async fn request(&mut self, request: Request) -> Result<Response, AgentError> {
        write_message(&mut self.stream, &request.encode()).await?;
        let msg = read_message(&mut self.stream).await?;
        Response::decode(msg)
    }
}

#[async_trait]
impl SigningAgent for AgentClient {
    async fn identities(&mut self) -> Result<Vec<AgentIdentity>, AgentError> {
        match self.request(Request::Identities).await? {
            Response::Identities(identities) => Ok(identities),
            Response::Failure => Err(AgentError::Refused),
            Response::Signature { .. } => Err(AgentError::Protocol(
                "signature in reply to identity request".to_string(),
            )),
        }
    }

    async fn sign(&mut self, key_blob: &[u8], data: &[u8], flags: u32) -> Result<Signature, AgentError> {
        let request = Request::Sign {
            key_blob: key_blob.to_vec(),
            data: data.to_vec(),
            flags,
        };

        match self.request(request).await? {
            Response::Signature { algorithm, blob } => {
                let algorithm = Algorithm::new(&algorithm)
                    .map_err(|e| AgentError::Protocol(format!("{}: {}", algorithm, e)))?;
                Signature::new(algorithm, blob).map_err(|e| AgentError::Protocol(e.to_string()))
            }
            Response::Failure => Err(AgentError::Refused),
            Response::Identities(_) => Err(AgentError::Protocol(
                "identities in reply to sign request".to_string(),
            )),
        }
    }
}
