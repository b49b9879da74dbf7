//! Redis Streams broker transport
//!
//! Each queue is a stream read by a consumer group. Declaring a queue creates
//! the group (and the stream via `MKSTREAM`); publishing is an `XADD` whose
//! single field carries the JSON job. Durability across restarts comes from
//! the server's append-only file.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError};

use super::broker::{BrokerChannel, BrokerConnector, BrokerError};
use crate::constants::JOB_PAYLOAD_FIELD;

impl From<RedisError> for BrokerError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            BrokerError::ConnectionLost(err.to_string())
        } else {
            BrokerError::Rejected(err.to_string())
        }
    }
}

/// Connects to Redis and hands out multiplexed channels
pub struct RedisConnector {
    client: Client,
    consumer_group: String,
}

impl RedisConnector {
    pub fn new(url: &str, consumer_group: impl Into<String>) -> Result<Self, BrokerError> {
        let client = Client::open(url).map_err(|e| BrokerError::Rejected(e.to_string()))?;
        Ok(Self {
            client,
            consumer_group: consumer_group.into(),
        })
    }
}

#[async_trait]
impl BrokerConnector for RedisConnector {
    type Channel = RedisChannel;

    async fn connect(&self) -> Result<RedisChannel, BrokerError> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(RedisChannel {
            conn,
            consumer_group: self.consumer_group.clone(),
        })
    }
}

/// Stream publisher over one multiplexed connection
#[derive(Clone)]
pub struct RedisChannel {
    conn: MultiplexedConnection,
    consumer_group: String,
}

#[async_trait]
impl BrokerChannel for RedisChannel {
    async fn declare_durable_queue(&self, queue: &str) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(queue)
            .arg(&self.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(()) => Ok(()),
            // Group already exists
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn send_persistent(&self, queue: &str, payload: &str) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();
        let _entry_id: String = redis::cmd("XADD")
            .arg(queue)
            .arg("*")
            .arg(JOB_PAYLOAD_FIELD)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
