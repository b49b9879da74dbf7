//! Transport seam between the queue client and a concrete broker

use async_trait::async_trait;

/// Failure reported by a broker transport
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// The connection is gone or unusable; reconnecting may help
    #[error("broker connection lost: {0}")]
    ConnectionLost(String),

    /// The broker answered but refused the command
    #[error("broker rejected the request: {0}")]
    Rejected(String),
}

/// Opens channels to a broker
#[async_trait]
pub trait BrokerConnector: Send + Sync + 'static {
    type Channel: BrokerChannel;

    async fn connect(&self) -> Result<Self::Channel, BrokerError>;
}

/// A live, cloneable handle safe for concurrent publishers
#[async_trait]
pub trait BrokerChannel: Clone + Send + Sync + 'static {
    /// Declare `queue` as durable. Must succeed when it already exists.
    async fn declare_durable_queue(&self, queue: &str) -> Result<(), BrokerError>;

    /// Append `payload` to `queue` so that it survives a broker restart
    async fn send_persistent(&self, queue: &str, payload: &str) -> Result<(), BrokerError>;

    /// Cheap liveness probe
    async fn ping(&self) -> Result<(), BrokerError>;
}
