//! SSH agent wire protocol, list and sign messages only.
//!
//! Wire format: 4-byte big-endian length prefix, one message type byte,
//! then the message body. Strings are themselves length-prefixed.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::AgentError;

pub const SSH_AGENT_FAILURE: u8 = 5;
pub const SSH2_AGENTC_REQUEST_IDENTITIES: u8 = 11;
pub const SSH2_AGENT_IDENTITIES_ANSWER: u8 = 12;
pub const SSH2_AGENTC_SIGN_REQUEST: u8 = 13;
pub const SSH2_AGENT_SIGN_RESPONSE: u8 = 14;

/// Sign flag asking for an `rsa-sha2-256` signature from an RSA key.
pub const SSH_AGENT_RSA_SHA2_256: u32 = 0x02;

/// Agents never send anything close to this.
const MAX_MESSAGE_SIZE: usize = 256 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    pub key_blob: Vec<u8>,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Identities,
    Sign {
        key_blob: Vec<u8>,
        data: Vec<u8>,
        flags: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Identities(Vec<AgentIdentity>),
    Signature { algorithm: String, blob: Vec<u8> },
    Failure,
}

impl Request {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        match self {
            Request::Identities => buf.put_u8(SSH2_AGENTC_REQUEST_IDENTITIES),
            Request::Sign {
                key_blob,
                data,
                flags,
            } => {
                buf.put_u8(SSH2_AGENTC_SIGN_REQUEST);
                put_string(&mut buf, key_blob);
                put_string(&mut buf, data);
                buf.put_u32(*flags);
            }
        }
        buf.freeze()
    }

    pub fn decode(mut msg: Bytes) -> Result<Self, AgentError> {
        match get_u8(&mut msg)? {
            SSH2_AGENTC_REQUEST_IDENTITIES => Ok(Request::Identities),
            SSH2_AGENTC_SIGN_REQUEST => {
                let key_blob = get_string(&mut msg)?.to_vec();
                let data = get_string(&mut msg)?.to_vec();
                let flags = get_u32(&mut msg)?;
                Ok(Request::Sign {
                    key_blob,
                    data,
                    flags,
                })
            }
            other => Err(AgentError::UnexpectedMessage(other)),
        }
    }
}

impl Response {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        match self {
            Response::Identities(identities) => {
                buf.put_u8(SSH2_AGENT_IDENTITIES_ANSWER);
                buf.put_u32(identities.len() as u32);
                for identity in identities {
                    put_string(&mut buf, &identity.key_blob);
                    put_string(&mut buf, identity.comment.as_bytes());
                }
            }
            Response::Signature { algorithm, blob } => {
                let mut signature = BytesMut::new();
                put_string(&mut signature, algorithm.as_bytes());
                put_string(&mut signature, blob);

                buf.put_u8(SSH2_AGENT_SIGN_RESPONSE);
                put_string(&mut buf, &signature);
            }
            Response::Failure => buf.put_u8(SSH_AGENT_FAILURE),
        }
        buf.freeze()
    }

    pub fn decode(mut msg: Bytes) -> Result<Self, AgentError> {
        match get_u8(&mut msg)? {
            SSH_AGENT_FAILURE => Ok(Response::Failure),
            SSH2_AGENT_IDENTITIES_ANSWER => {
                let count = get_u32(&mut msg)? as usize;
                // each identity needs at least two length prefixes
                if count > msg.remaining() / 8 {
                    return Err(AgentError::Protocol(format!(
                        "identity count {} exceeds message size",
                        count
                    )));
                }
                let mut identities = Vec::with_capacity(count);
                for _ in 0..count {
                    let key_blob = get_string(&mut msg)?.to_vec();
                    let comment = String::from_utf8_lossy(&get_string(&mut msg)?).into_owned();
                    identities.push(AgentIdentity { key_blob, comment });
                }
                Ok(Response::Identities(identities))
            }
            SSH2_AGENT_SIGN_RESPONSE => {
                let mut signature = get_string(&mut msg)?;
                let algorithm = String::from_utf8(get_string(&mut signature)?.to_vec())
                    .map_err(|_| AgentError::Protocol("signature algorithm is not UTF-8".to_string()))?;
                let blob = get_string(&mut signature)?.to_vec();
                Ok(Response::Signature { algorithm, blob })
            }
            other => Err(AgentError::UnexpectedMessage(other)),
        }
    }
}

/// Read one length-prefixed agent message.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Bytes> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len == 0 || len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("bad agent message length: {} bytes", len),
        ));
    }

    let mut buf = BytesMut::zeroed(len);
    reader.read_exact(&mut buf).await?;

    Ok(buf.freeze())
}

/// Write one length-prefixed agent message.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, msg: &[u8]) -> io::Result<()> {
    writer.write_all(&(msg.len() as u32).to_be_bytes()).await?;
    writer.write_all(msg).await?;
    writer.flush().await
}

fn put_string(buf: &mut BytesMut, value: &[u8]) {
    buf.put_u32(value.len() as u32);
    buf.put_slice(value);
}

fn get_u8(buf: &mut Bytes) -> Result<u8, AgentError> {
    if buf.remaining() < 1 {
        return Err(AgentError::Protocol("empty message".to_string()));
    }
    Ok(buf.get_u8())
}

fn get_u32(buf: &mut Bytes) -> Result<u32, AgentError> {
    if buf.remaining() < 4 {
        return Err(AgentError::Protocol("truncated integer".to_string()));
    }
    Ok(buf.get_u32())
}

fn get_string(buf: &mut Bytes) -> Result<Bytes, AgentError> {
    let len = get_u32(buf)? as usize;
    if buf.remaining() < len {
        return Err(AgentError::Protocol(format!(
            "string of {} bytes with only {} remaining",
            len,
            buf.remaining()
        )));
    }
    Ok(buf.split_to(len))
}
