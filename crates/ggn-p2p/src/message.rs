use std::net::{Ipv4Addr, SocketAddr};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// One decoded frame, tagged with the address of the peer that sent it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rpc {
    pub from: SocketAddr,
    pub payload: Bytes,
}

impl Rpc {
    pub fn new(from: SocketAddr, payload: impl Into<Bytes>) -> Self {
        Self {
            from,
            payload: payload.into(),
        }
    }

    /// A blank message for a decoder to fill. The origin is stamped by the
    /// transport once decoding succeeds.
    pub fn empty() -> Self {
        Self {
            from: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            payload: Bytes::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Messages exchanged by [`HelloHandshake`](crate::HelloHandshake) before any
/// application frames flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeMessage {
    Hello { version: u32 },
    HelloAck { version: u32 },
}

impl HandshakeMessage {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "Hello",
            Self::HelloAck { .. } => "HelloAck",
        }
    }
}
