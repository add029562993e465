use std::io::{Cursor, Read};
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{info, warn};

use ggn_p2p::{TcpPeer, TcpTransport};
use ggn_store::{BlobStore, DiskStore};

use crate::config::FileServerConfig;
use crate::error::{NodeError, NodeResult};
use crate::hooks::{LogPeers, MessageHook};
use crate::locks::ShardLocks;

/// A node: one blob store, one peer transport.
///
/// Store access goes through per-shard locks; the raw [`DiskStore`] takes
/// none of its own.
pub struct FileServer {
    config: FileServerConfig,
    store: DiskStore,
    transport: Arc<TcpTransport>,
    locks: ShardLocks,
    stop: Notify,
}

impl FileServer {
    pub fn new(config: FileServerConfig) -> Self {
        let store = DiskStore::new(config.store_config());
        let transport = TcpTransport::new(config.transport_config().with_on_peer(LogPeers));
        Self {
            config,
            store,
            transport: Arc::new(transport),
            locks: ShardLocks::new(),
            stop: Notify::new(),
        }
    }

    pub fn config(&self) -> &FileServerConfig {
        &self.config
    }

    pub fn store(&self) -> &DiskStore {
        &self.store
    }

    pub fn transport(&self) -> &Arc<TcpTransport> {
        &self.transport
    }

    /// Bind the transport. Returns the bound address.
    pub async fn start(&self) -> NodeResult<SocketAddr> {
        let addr = self.transport.listen_and_accept().await?;
        info!(
            %addr,
            root = %self.store.root().display(),
            transform = %self.store.transform(),
            "file server started"
        );
        Ok(addr)
    }

    /// Drain the ingestion channel into `hook` until [`shutdown`](Self::shutdown)
    /// or the transport is shut down directly.
    pub async fn run(&self, hook: Arc<dyn MessageHook>) -> NodeResult<()> {
        if self.transport.local_addr().is_none() {
            return Err(NodeError::NotStarted);
        }
        let mut rx = self.transport.consume().ok_or(NodeError::AlreadyConsuming)?;

        loop {
            tokio::select! {
                _ = self.stop.notified() => break,
                _ = self.transport.shut_down() => break,
                msg = rx.recv() => match msg {
                    Some(rpc) => {
                        let from = rpc.from;
                        if let Err(e) = hook.on_message(rpc).await {
                            warn!(%from, error = %e, "message hook failed");
                        }
                    }
                    None => break,
                },
            }
        }

        self.transport.shutdown();
        info!("file server stopped");
        Ok(())
    }

    /// [`start`](Self::start) followed by [`run`](Self::run).
    pub async fn serve(&self, hook: Arc<dyn MessageHook>) -> NodeResult<()> {
        self.start().await?;
        self.run(hook).await
    }

    /// Ask a running [`run`](Self::run) loop to stop.
    pub fn shutdown(&self) {
        self.stop.notify_one();
        self.transport.shutdown();
    }

    /// Open an outbound connection to another node.
    pub async fn dial(&self, addr: SocketAddr) -> NodeResult<TcpPeer> {
        Ok(self.transport.dial(addr).await?)
    }

    pub fn store_blob(&self, key: &str, reader: &mut dyn Read) -> NodeResult<u64> {
        self.locked(key, || self.store.write(key, reader))
    }

    pub fn get_blob(&self, key: &str) -> NodeResult<Cursor<Vec<u8>>> {
        self.locked(key, || self.store.read(key))
    }

    pub fn has_blob(&self, key: &str) -> NodeResult<bool> {
        self.locked(key, || self.store.has(key))
    }

    pub fn delete_blob(&self, key: &str) -> NodeResult<()> {
        self.locked(key, || self.store.delete(key))
    }

    fn locked<T>(
        &self,
        key: &str,
        op: impl FnOnce() -> ggn_store::StoreResult<T>,
    ) -> NodeResult<T> {
        let path_key = self.store.path_key(key)?;
        Ok(self.locks.with_lock(path_key.first_path_name(), op)?)
    }
}

impl std::fmt::Debug for FileServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileServer")
            .field("config", &self.config)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}
