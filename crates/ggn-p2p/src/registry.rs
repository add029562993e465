use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::RwLock;

use crate::peer::PeerInfo;

/// Peers with a live connection handler, keyed by remote address.
///
/// Owned by the transport. Every mutation goes through the single lock.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<SocketAddr, PeerInfo>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer. Returns the previous entry for the address, if any.
    pub fn insert(&self, info: PeerInfo) -> Option<PeerInfo> {
        self.peers
            .write()
            .expect("peer registry lock poisoned")
            .insert(info.addr, info)
    }

    pub fn remove(&self, addr: &SocketAddr) -> Option<PeerInfo> {
        self.peers
            .write()
            .expect("peer registry lock poisoned")
            .remove(addr)
    }

    pub fn get(&self, addr: &SocketAddr) -> Option<PeerInfo> {
        self.peers
            .read()
            .expect("peer registry lock poisoned")
            .get(addr)
            .cloned()
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.peers
            .read()
            .expect("peer registry lock poisoned")
            .contains_key(addr)
    }

    pub fn len(&self) -> usize {
        self.peers.read().expect("peer registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted snapshot of registered addresses.
    pub fn addrs(&self) -> Vec<SocketAddr> {
        let map = self.peers.read().expect("peer registry lock poisoned");
        let mut addrs: Vec<SocketAddr> = map.keys().copied().collect();
        addrs.sort();
        addrs
    }
}
