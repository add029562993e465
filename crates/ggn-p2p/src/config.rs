use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::codec::{Decoder, LengthPrefixedDecoder};
use crate::handshake::{Handshake, NopHandshake};
use crate::peer::OnPeer;

pub const DEFAULT_MAX_CONNECTIONS: usize = 256;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Settings for a [`TcpTransport`](crate::TcpTransport).
///
/// The handshake, decoder and on-connect hook are pluggable; the defaults are
/// [`NopHandshake`], [`LengthPrefixedDecoder`] and no hook.
#[derive(Clone)]
pub struct TcpTransportConfig {
    /// Address to bind, e.g. `"0.0.0.0:30090"`. Port 0 picks a free port.
    pub listen_addr: String,
    pub handshake: Arc<dyn Handshake>,
    pub decoder: Arc<dyn Decoder>,
    pub on_peer: Option<Arc<dyn OnPeer>>,
    /// Connections handled at once; further peers wait in the listen backlog.
    pub max_connections: usize,
    /// Ingestion channel depth before handlers start to block.
    pub channel_capacity: usize,
    /// Upper bound on the handshake. `None` waits forever.
    pub handshake_timeout: Option<Duration>,
}

impl TcpTransportConfig {
    pub fn new(listen_addr: impl Into<String>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            handshake: Arc::new(NopHandshake),
            decoder: Arc::new(LengthPrefixedDecoder::new()),
            on_peer: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            handshake_timeout: None,
        }
    }

    pub fn with_handshake(mut self, handshake: impl Handshake + 'static) -> Self {
        self.handshake = Arc::new(handshake);
        self
    }

    pub fn with_decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    pub fn with_on_peer(mut self, hook: impl OnPeer + 'static) -> Self {
        self.on_peer = Some(Arc::new(hook));
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity.max(1);
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for TcpTransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpTransportConfig")
            .field("listen_addr", &self.listen_addr)
            .field("on_peer", &self.on_peer.is_some())
            .field("max_connections", &self.max_connections)
            .field("channel_capacity", &self.channel_capacity)
            .field("handshake_timeout", &self.handshake_timeout)
            .finish_non_exhaustive()
    }
}
