use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::codec::write_frame;
use crate::error::ProtocolResult;

/// Metadata about a connected peer, cheap to clone and share.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerInfo {
    pub addr: SocketAddr,
    pub outbound: bool,
    pub connected_at_ms: u64,
}

impl PeerInfo {
    pub fn direction(&self) -> &'static str {
        if self.outbound {
            "outbound"
        } else {
            "inbound"
        }
    }
}

/// One live TCP connection to a remote node.
///
/// `outbound` is true when we dialed the connection and false when it was
/// accepted by our listener. The peer is owned by whoever created it; the
/// connection closes when the peer is dropped or [`close`](Self::close)d.
#[derive(Debug)]
pub struct TcpPeer {
    stream: TcpStream,
    remote_addr: SocketAddr,
    outbound: bool,
    connected_at_ms: u64,
}

impl TcpPeer {
    pub fn new(stream: TcpStream, remote_addr: SocketAddr, outbound: bool) -> Self {
        Self {
            stream,
            remote_addr,
            outbound,
            connected_at_ms: now_ms(),
        }
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn is_outbound(&self) -> bool {
        self.outbound
    }

    pub fn info(&self) -> PeerInfo {
        PeerInfo {
            addr: self.remote_addr,
            outbound: self.outbound,
            connected_at_ms: self.connected_at_ms,
        }
    }

    /// The underlying stream, for handshakes and decoders.
    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Send one length-prefixed frame.
    pub async fn send(&mut self, payload: &[u8]) -> ProtocolResult<()> {
        write_frame(&mut self.stream, payload).await
    }

    /// Shut down the write half and drop the connection.
    pub async fn close(mut self) -> ProtocolResult<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Hook run after a successful handshake, before any frames are decoded.
///
/// Returning an error drops the connection without affecting other peers.
#[async_trait]
pub trait OnPeer: Send + Sync {
    async fn on_peer(&self, peer: &PeerInfo) -> ProtocolResult<()>;
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::read_frame;
    use crate::message::MAX_FRAME_SIZE;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn peer_metadata_and_send() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            let mut peer = TcpPeer::new(stream, addr, true);
            assert!(peer.is_outbound());
            assert_eq!(peer.info().direction(), "outbound");
            peer.send(b"hi").await.unwrap();
            peer.close().await.unwrap();
        });

        let (stream, remote) = listener.accept().await.unwrap();
        let mut peer = TcpPeer::new(stream, remote, false);
        assert_eq!(peer.remote_addr(), remote);
        assert_eq!(peer.info().direction(), "inbound");

        let frame = read_frame(peer.stream_mut(), MAX_FRAME_SIZE).await.unwrap();
        assert_eq!(&frame[..], b"hi");
        client.await.unwrap();
    }

    #[test]
    fn now_ms_is_after_epoch() {
        assert!(now_ms() > 0);
    }
}
