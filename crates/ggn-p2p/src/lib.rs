//! Peer transport for GG Network nodes.
//!
//! A [`TcpTransport`] listens for inbound connections, runs a pluggable
//! [`Handshake`] on each one, and then pulls frames off it with a pluggable
//! [`Decoder`], publishing every frame as an [`Rpc`] on a single ingestion
//! channel obtained from [`TcpTransport::consume`].
//!
//! The default framing is a 4-byte big-endian length followed by the payload.

pub mod codec;
pub mod config;
pub mod error;
pub mod handshake;
pub mod message;
pub mod peer;
pub mod registry;
pub mod transport;

pub use codec::{encode_frame, read_frame, write_frame, Decoder, LengthPrefixedDecoder};
pub use config::{TcpTransportConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_CONNECTIONS};
pub use error::{ProtocolError, ProtocolResult};
pub use handshake::{Handshake, HelloHandshake, NopHandshake};
pub use message::{HandshakeMessage, Rpc, MAX_FRAME_SIZE, PROTOCOL_VERSION};
pub use peer::{OnPeer, PeerInfo, TcpPeer};
pub use registry::PeerRegistry;
pub use transport::TcpTransport;
