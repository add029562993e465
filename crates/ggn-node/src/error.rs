use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] ggn_store::StoreError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ggn_p2p::ProtocolError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("node is not listening; call start() first")]
    NotStarted,

    #[error("ingestion channel already taken")]
    AlreadyConsuming,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type NodeResult<T> = Result<T, NodeError>;
