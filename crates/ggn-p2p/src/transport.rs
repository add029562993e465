use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::config::TcpTransportConfig;
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::Rpc;
use crate::peer::TcpPeer;
use crate::registry::PeerRegistry;

/// Pause after a failed `accept` so a persistent error (e.g. out of file
/// descriptors) does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// TCP listener that turns every inbound connection into a stream of [`Rpc`]s.
///
/// Each accepted connection gets its own task which runs the configured
/// handshake, the on-connect hook, and then the decoder in a loop, publishing
/// every frame on one shared ingestion channel. A failure in any of those
/// steps closes that connection only. Frames from one connection arrive in
/// order; frames from different connections interleave arbitrarily.
pub struct TcpTransport {
    config: TcpTransportConfig,
    rpc_tx: mpsc::Sender<Rpc>,
    rpc_rx: Mutex<Option<mpsc::Receiver<Rpc>>>,
    peers: PeerRegistry,
    connection_sem: Arc<Semaphore>,
    shutdown_tx: watch::Sender<bool>,
    local_addr: OnceLock<SocketAddr>,
}

impl TcpTransport {
    pub fn new(config: TcpTransportConfig) -> Self {
        let (rpc_tx, rpc_rx) = mpsc::channel(config.channel_capacity);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            connection_sem: Arc::new(Semaphore::new(config.max_connections)),
            rpc_tx,
            rpc_rx: Mutex::new(Some(rpc_rx)),
            peers: PeerRegistry::new(),
            shutdown_tx,
            local_addr: OnceLock::new(),
            config,
        }
    }

    pub fn config(&self) -> &TcpTransportConfig {
        &self.config
    }

    /// Peers whose handlers are currently consuming frames.
    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    /// Bound address, once [`listen_and_accept`](Self::listen_and_accept) succeeded.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Take the ingestion channel. Only the first call returns it.
    pub fn consume(&self) -> Option<mpsc::Receiver<Rpc>> {
        self.rpc_rx.lock().expect("rpc receiver lock poisoned").take()
    }

    /// Bind the listener and start accepting in the background.
    ///
    /// Returns once the socket is bound. A bind failure is returned as
    /// [`ProtocolError::Bind`]; everything after that is handled by the
    /// accept loop.
    pub async fn listen_and_accept(self: &Arc<Self>) -> ProtocolResult<SocketAddr> {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .map_err(|source| ProtocolError::Bind {
                addr: self.config.listen_addr.clone(),
                source,
            })?;
        let addr = listener.local_addr()?;
        let _ = self.local_addr.set(addr);

        info!(
            %addr,
            max_connections = self.config.max_connections,
            "listening for peers"
        );

        tokio::spawn(Arc::clone(self).accept_loop(listener));
        Ok(addr)
    }

    /// Connect to a remote node. The returned peer has completed the
    /// handshake and passed the on-connect hook.
    pub async fn dial(&self, addr: SocketAddr) -> ProtocolResult<TcpPeer> {
        let stream = TcpStream::connect(addr).await?;
        let mut peer = TcpPeer::new(stream, addr, true);
        self.run_handshake(&mut peer).await?;
        if let Some(hook) = &self.config.on_peer {
            hook.on_peer(&peer.info()).await?;
        }
        debug!(peer = %addr, "dialed peer");
        Ok(peer)
    }

    /// Stop accepting and close every open connection.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Resolves once [`shutdown`](Self::shutdown) has been called, including
    /// when it already was.
    pub async fn shut_down(&self) {
        let mut rx = self.shutdown_tx.subscribe();
        stopped(&mut rx).await;
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        let mut shutdown = self.shutdown_tx.subscribe();
        loop {
            let permit = tokio::select! {
                _ = stopped(&mut shutdown) => break,
                permit = Arc::clone(&self.connection_sem).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let accepted = tokio::select! {
                _ = stopped(&mut shutdown) => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => {
                    debug!(peer = %addr, "new incoming connection");
                    tokio::spawn(Arc::clone(&self).handle_connection(stream, addr, permit));
                }
                Err(e) => {
                    warn!(error = %e, "error accepting connection");
                    drop(permit);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
        info!("accept loop stopped");
    }

    async fn handle_connection(
        self: Arc<Self>,
        stream: TcpStream,
        addr: SocketAddr,
        _permit: OwnedSemaphorePermit,
    ) {
        let mut peer = TcpPeer::new(stream, addr, false);
        let mut shutdown = self.shutdown_tx.subscribe();

        let result = tokio::select! {
            _ = stopped(&mut shutdown) => Ok(()),
            result = self.serve_peer(&mut peer) => result,
        };
        self.peers.remove(&addr);

        match result {
            Ok(()) | Err(ProtocolError::ConnectionClosed) => {
                debug!(peer = %addr, "connection finished")
            }
            Err(e) => warn!(peer = %addr, error = %e, "dropping peer"),
        }
        if let Err(e) = peer.close().await {
            debug!(peer = %addr, error = %e, "error closing connection");
        }
    }

    /// Handshake, on-connect hook, then decode until the stream fails.
    async fn serve_peer(&self, peer: &mut TcpPeer) -> ProtocolResult<()> {
        let addr = peer.remote_addr();
        self.run_handshake(peer).await?;

        let info = peer.info();
        if let Some(hook) = &self.config.on_peer {
            hook.on_peer(&info).await?;
        }
        self.peers.insert(info);

        loop {
            let mut rpc = Rpc::empty();
            self.config.decoder.decode(peer.stream_mut(), &mut rpc).await?;
            rpc.from = addr;
            if self.rpc_tx.send(rpc).await.is_err() {
                debug!(peer = %addr, "ingestion channel closed");
                return Ok(());
            }
        }
    }

    async fn run_handshake(&self, peer: &mut TcpPeer) -> ProtocolResult<()> {
        let addr = peer.remote_addr();
        let handshake = self.config.handshake.handshake(peer);
        match self.config.handshake_timeout {
            Some(limit) => tokio::time::timeout(limit, handshake)
                .await
                .map_err(|_| ProtocolError::HandshakeTimeout(addr, limit))?,
            None => handshake.await,
        }
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("listen_addr", &self.config.listen_addr)
            .field("local_addr", &self.local_addr())
            .field("peer_count", &self.peers.len())
            .finish()
    }
}

/// Resolves once shutdown has been requested or the transport is gone.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
