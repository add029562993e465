use async_trait::async_trait;
use tracing::info;

use ggn_p2p::{OnPeer, PeerInfo, ProtocolResult, Rpc};

use crate::error::NodeResult;

/// Receives every message drained from the ingestion channel.
///
/// An error is logged and the node keeps consuming.
#[async_trait]
pub trait MessageHook: Send + Sync {
    async fn on_message(&self, rpc: Rpc) -> NodeResult<()>;
}

/// Logs each message and drops it.
pub struct LogMessages;

#[async_trait]
impl MessageHook for LogMessages {
    async fn on_message(&self, rpc: Rpc) -> NodeResult<()> {
        info!(from = %rpc.from, bytes = rpc.len(), "received message");
        Ok(())
    }
}

/// On-connect hook that records new peers in the log.
pub struct LogPeers;

#[async_trait]
impl OnPeer for LogPeers {
    async fn on_peer(&self, peer: &PeerInfo) -> ProtocolResult<()> {
        info!(peer = %peer.addr, direction = peer.direction(), "peer connected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    #[tokio::test]
    async fn log_messages_accepts_everything() {
        let from: SocketAddr = "127.0.0.1:1".parse().unwrap();
        LogMessages.on_message(Rpc::new(from, b"x".to_vec())).await.unwrap();
    }

    #[tokio::test]
    async fn log_peers_accepts_everything() {
        let info = PeerInfo {
            addr: "127.0.0.1:2".parse().unwrap(),
            outbound: false,
            connected_at_ms: 0,
        };
        LogPeers.on_peer(&info).await.unwrap();
    }
}
