use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ggn_p2p::{HelloHandshake, NopHandshake, TcpTransportConfig};
use ggn_store::{PathTransform, StoreConfig, DEFAULT_ROOT};

use crate::error::{NodeError, NodeResult};

/// Which handshake inbound and outbound connections run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandshakeKind {
    /// Accept everyone, exchange nothing.
    #[default]
    Nop,
    /// Protocol version exchange.
    Hello,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    pub listen_addr: String,
    pub storage_root: PathBuf,
    pub path_transform: PathTransform,
    pub max_connections: usize,
    pub channel_capacity: usize,
    pub handshake: HandshakeKind,
    pub handshake_timeout_ms: Option<u64>,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:30090".into(),
            storage_root: PathBuf::from(DEFAULT_ROOT),
            path_transform: PathTransform::ContentAddressed,
            max_connections: ggn_p2p::DEFAULT_MAX_CONNECTIONS,
            channel_capacity: ggn_p2p::DEFAULT_CHANNEL_CAPACITY,
            handshake: HandshakeKind::default(),
            handshake_timeout_ms: None,
        }
    }
}

impl FileServerConfig {
    /// Parse a TOML document. Missing keys take their default values.
    pub fn from_toml_str(s: &str) -> NodeResult<Self> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> NodeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            root: self.storage_root.clone(),
            transform: self.path_transform,
        }
    }

    /// Transport settings, without an on-connect hook.
    pub fn transport_config(&self) -> TcpTransportConfig {
        let mut config = TcpTransportConfig::new(self.listen_addr.clone())
            .with_max_connections(self.max_connections)
            .with_channel_capacity(self.channel_capacity);
        config = match self.handshake {
            HandshakeKind::Nop => config.with_handshake(NopHandshake),
            HandshakeKind::Hello => config.with_handshake(HelloHandshake::new()),
        };
        if let Some(ms) = self.handshake_timeout_ms {
            config = config.with_handshake_timeout(Duration::from_millis(ms));
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = FileServerConfig::default();
        assert_eq!(c.listen_addr, "127.0.0.1:30090");
        assert_eq!(c.storage_root, PathBuf::from("ggnetwork"));
        assert_eq!(c.path_transform, PathTransform::ContentAddressed);
        assert_eq!(c.max_connections, 256);
        assert_eq!(c.handshake, HandshakeKind::Nop);
        assert!(c.handshake_timeout_ms.is_none());
    }

    #[test]
    fn parse_full_toml() {
        let c = FileServerConfig::from_toml_str(
            r#"
            listen_addr = "0.0.0.0:4000"
            storage_root = "/var/lib/ggn"
            path_transform = "identity"
            max_connections = 8
            channel_capacity = 16
            handshake = "hello"
            handshake_timeout_ms = 2500
            "#,
        )
        .unwrap();
        assert_eq!(c.listen_addr, "0.0.0.0:4000");
        assert_eq!(c.storage_root, PathBuf::from("/var/lib/ggn"));
        assert_eq!(c.path_transform, PathTransform::Identity);
        assert_eq!(c.handshake, HandshakeKind::Hello);

        let t = c.transport_config();
        assert_eq!(t.max_connections, 8);
        assert_eq!(t.channel_capacity, 16);
        assert_eq!(t.handshake_timeout, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let c = FileServerConfig::from_toml_str(r#"listen_addr = "127.0.0.1:0""#).unwrap();
        assert_eq!(c.listen_addr, "127.0.0.1:0");
        assert_eq!(c.path_transform, PathTransform::ContentAddressed);
        assert_eq!(c.channel_capacity, ggn_p2p::DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = FileServerConfig::from_toml_str(r#"path_transform = "sha256""#).unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(&path, "handshake = \"hello\"\n").unwrap();
        assert_eq!(FileServerConfig::load(&path).unwrap().handshake, HandshakeKind::Hello);
    }

    #[test]
    fn store_config_mirrors_fields() {
        let c = FileServerConfig::default();
        let s = c.store_config();
        assert_eq!(s.root, c.storage_root);
        assert_eq!(s.transform, c.path_transform);
    }
}
