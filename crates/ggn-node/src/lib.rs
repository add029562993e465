//! GG Network node runtime.
//!
//! A [`FileServer`] owns a content-addressed [`DiskStore`](ggn_store::DiskStore)
//! and a [`TcpTransport`](ggn_p2p::TcpTransport). It binds the transport,
//! drains the ingestion channel into a [`MessageHook`], and serializes store
//! access per shard.

pub mod config;
pub mod error;
pub mod hooks;
pub mod locks;
pub mod server;

pub use config::{FileServerConfig, HandshakeKind};
pub use error::{NodeError, NodeResult};
pub use hooks::{LogMessages, LogPeers, MessageHook};
pub use locks::ShardLocks;
pub use server::FileServer;
