//! Job queue: delivery of judge jobs to the durable broker
//!
//! - `broker`: transport traits implemented by concrete brokers
//! - `redis_broker`: Redis Streams transport
//! - `client`: connection lifecycle, bounded reconnection and publishing
//! - `backoff`: delay policies between connection attempts

pub mod backoff;
pub mod broker;
pub mod client;
pub mod redis_broker;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::models::Job;

pub use backoff::{BackoffStrategy, ExponentialBackoff, FixedBackoff};
pub use broker::{BrokerChannel, BrokerConnector, BrokerError};
pub use client::QueueClient;
pub use redis_broker::{RedisChannel, RedisConnector};

/// Errors surfaced to callers of the queue
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// No usable broker channel; the job was not handed over
    #[error("job broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// The broker refused the job
    #[error("job broker rejected the job: {0}")]
    PublishRejected(String),

    #[error("failed to serialize job: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("could not connect to the job broker after {attempts} attempts: {last_error}")]
    ConnectFailed { attempts: u32, last_error: String },
}

impl From<BrokerError> for QueueError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::ConnectionLost(reason) => QueueError::BrokerUnavailable(reason),
            BrokerError::Rejected(reason) => QueueError::PublishRejected(reason),
        }
    }
}

/// Hands judge jobs to workers
#[cfg_attr(test, automock)]
#[async_trait]
pub trait JobPublisher: Send + Sync {
    /// Publish `job` to `queue`. Never buffers when the broker is unreachable.
    async fn publish(&self, queue: &str, job: &Job) -> Result<(), QueueError>;

    fn is_connected(&self) -> bool;
}
