use async_trait::async_trait;

use crate::codec::{read_frame, write_frame};
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{HandshakeMessage, PROTOCOL_VERSION};
use crate::peer::TcpPeer;

/// Handshake frames are tiny; anything bigger is not a handshake.
const MAX_HANDSHAKE_FRAME: usize = 1024;

/// Negotiation run exactly once per connection, before any frames are decoded.
#[async_trait]
pub trait Handshake: Send + Sync {
    async fn handshake(&self, peer: &mut TcpPeer) -> ProtocolResult<()>;
}

/// Accepts every peer without exchanging any bytes.
///
/// A placeholder, not a security boundary.
#[derive(Clone, Copy, Debug, Default)]
pub struct NopHandshake;

#[async_trait]
impl Handshake for NopHandshake {
    async fn handshake(&self, _peer: &mut TcpPeer) -> ProtocolResult<()> {
        Ok(())
    }
}

/// Version exchange.
///
/// The dialing side sends `Hello` and waits for `HelloAck`; the accepting side
/// waits for `Hello`, checks the version, and answers with `HelloAck`. Each
/// message is one bincode-encoded frame.
#[derive(Clone, Copy, Debug)]
pub struct HelloHandshake {
    version: u32,
}

impl HelloHandshake {
    pub fn new() -> Self {
        Self::with_version(PROTOCOL_VERSION)
    }

    pub fn with_version(version: u32) -> Self {
        Self { version }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    async fn send(peer: &mut TcpPeer, msg: &HandshakeMessage) -> ProtocolResult<()> {
        let bytes =
            bincode::serialize(msg).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        write_frame(peer.stream_mut(), &bytes).await
    }

    async fn recv(peer: &mut TcpPeer) -> ProtocolResult<HandshakeMessage> {
        let frame = read_frame(peer.stream_mut(), MAX_HANDSHAKE_FRAME).await?;
        bincode::deserialize(&frame).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }

    fn check_version(&self, remote: u32) -> ProtocolResult<()> {
        if remote != self.version {
            return Err(ProtocolError::VersionMismatch {
                local: self.version,
                remote,
            });
        }
        Ok(())
    }
}

impl Default for HelloHandshake {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handshake for HelloHandshake {
    async fn handshake(&self, peer: &mut TcpPeer) -> ProtocolResult<()> {
        if peer.is_outbound() {
            Self::send(peer, &HandshakeMessage::Hello { version: self.version }).await?;
            match Self::recv(peer).await? {
                HandshakeMessage::HelloAck { version } => self.check_version(version),
                other => Err(ProtocolError::HandshakeFailed(format!(
                    "expected HelloAck, got {}",
                    other.type_name()
                ))),
            }
        } else {
            match Self::recv(peer).await? {
                HandshakeMessage::Hello { version } => {
                    self.check_version(version)?;
                    Self::send(peer, &HandshakeMessage::HelloAck { version: self.version }).await
                }
                other => Err(ProtocolError::HandshakeFailed(format!(
                    "expected Hello, got {}",
                    other.type_name()
                ))),
            }
        }
    }
}
