// src/agent/mod.rs
mod client;
pub mod protocol;

pub use client::AgentClient;
pub use protocol::AgentIdentity;

use async_trait::async_trait;
use ssh_key::Signature;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("couldn't connect to agent: {0}")]
    Connect(String),

    #[error("agent I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("agent protocol error: {0}")]
    Protocol(String),

    #[error("agent refused the request")]
    Refused,

    #[error("unexpected agent message type {0}")]
    UnexpectedMessage(u8),
}

/// Something holding private keys that signs on request without exposing them.
#[async_trait]
pub trait SigningAgent: Send {
    async fn identities(&mut self) -> Result<Vec<AgentIdentity>, AgentError>;

    async fn sign(&mut self, key_blob: &[u8], data: &[u8], flags: u32) -> Result<Signature, AgentError>;
}
