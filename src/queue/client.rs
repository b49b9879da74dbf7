//! Broker connection lifecycle and job publishing

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::backoff::{BackoffStrategy, ExponentialBackoff, FixedBackoff};
use super::broker::{BrokerChannel, BrokerConnector, BrokerError};
use super::{JobPublisher, QueueError};
use crate::config::{BackoffKind, BrokerConfig};
use crate::models::Job;

#[derive(Clone)]
enum ConnectionState<Ch> {
    Disconnected,
    /// `generation` identifies the channel across reconnects
    Connected { channel: Ch, generation: u64 },
    Closed,
}

/// Resets the reconnection flag when a cycle ends, however it ends
struct CycleGuard(Arc<AtomicBool>);

impl CycleGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Inner<C: BrokerConnector> {
    connector: C,
    queues: Vec<String>,
    backoff: Box<dyn BackoffStrategy>,
    max_attempts: u32,
    publish_timeout: Duration,
    state: RwLock<ConnectionState<C::Channel>>,
    generations: AtomicU64,
    reconnecting: Arc<AtomicBool>,
}

/// Shared client owning the single broker connection of this process.
///
/// Cloning is cheap and every clone sees the same connection. While
/// disconnected, publishes fail immediately; nothing is buffered in memory.
pub struct QueueClient<C: BrokerConnector> {
    inner: Arc<Inner<C>>,
}

impl<C: BrokerConnector> Clone for QueueClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: BrokerConnector> QueueClient<C> {
    pub fn new(
        connector: C,
        queues: Vec<String>,
        backoff: Box<dyn BackoffStrategy>,
        max_attempts: u32,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                queues,
                backoff,
                max_attempts: max_attempts.max(1),
                publish_timeout,
                state: RwLock::new(ConnectionState::Disconnected),
                generations: AtomicU64::new(0),
                reconnecting: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    /// Build a client from broker configuration
    pub fn from_config(connector: C, config: &BrokerConfig) -> Self {
        let backoff: Box<dyn BackoffStrategy> = match config.backoff {
            BackoffKind::Fixed => Box::new(FixedBackoff::new(config.retry_delay)),
            BackoffKind::Exponential => {
                Box::new(ExponentialBackoff::new(config.retry_delay, config.max_delay))
            }
        };

        Self::new(
            connector,
            config.queues(),
            backoff,
            config.connect_attempts,
            config.publish_timeout,
        )
    }

    /// Connect and declare every queue as durable.
    ///
    /// Makes at most `max_attempts` attempts. When already connected the
    /// queues are declared again on the live channel.
    pub async fn connect(&self) -> Result<(), QueueError> {
        match self.inner.snapshot() {
            ConnectionState::Closed => Err(closed()),
            ConnectionState::Connected { channel, generation } => {
                if let Err(e) = self.inner.declare_queues(&channel).await {
                    if matches!(e, BrokerError::ConnectionLost(_)) {
                        self.inner.mark_disconnected(generation, &e.to_string());
                    }
                    return Err(e.into());
                }
                Ok(())
            }
            ConnectionState::Disconnected => {
                let Some(_guard) = CycleGuard::acquire(&self.inner.reconnecting) else {
                    return Err(QueueError::BrokerUnavailable(
                        "reconnection already in progress".to_string(),
                    ));
                };
                self.inner.connect_with_retry().await
            }
        }
    }

    /// Serialize `job` and append it to `queue`
    pub async fn publish(&self, queue: &str, job: &Job) -> Result<(), QueueError> {
        let (channel, generation) = match self.inner.snapshot() {
            ConnectionState::Connected { channel, generation } => (channel, generation),
            ConnectionState::Disconnected => {
                return Err(QueueError::BrokerUnavailable(
                    "not connected to the job broker".to_string(),
                ));
            }
            ConnectionState::Closed => return Err(closed()),
        };

        let payload = serde_json::to_string(job)?;

        match timeout(self.inner.publish_timeout, channel.send_persistent(queue, &payload)).await {
            Ok(Ok(())) => {
                debug!(queue, submission_id = %job.submission_id, "Job published");
                Ok(())
            }
            Ok(Err(BrokerError::Rejected(reason))) => {
                warn!(queue, submission_id = %job.submission_id, reason = %reason, "Broker rejected job");
                Err(QueueError::PublishRejected(reason))
            }
            Ok(Err(BrokerError::ConnectionLost(reason))) => {
                self.inner.mark_disconnected(generation, &reason);
                Err(QueueError::BrokerUnavailable(reason))
            }
            Err(_) => {
                let reason = format!("publish timed out after {:?}", self.inner.publish_timeout);
                self.inner.mark_disconnected(generation, &reason);
                Err(QueueError::BrokerUnavailable(reason))
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.inner.snapshot(), ConnectionState::Connected { .. })
    }

    /// Probe the connection every `interval`.
    ///
    /// A failed probe drops the channel and starts a reconnection cycle. While
    /// disconnected with no cycle running, each tick starts a new one. The
    /// task ends once the client is closed.
    pub fn spawn_monitor(&self, interval: Duration) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;

                match inner.snapshot() {
                    ConnectionState::Closed => break,
                    ConnectionState::Connected { channel, generation } => {
                        match timeout(inner.publish_timeout, channel.ping()).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => inner.mark_disconnected(generation, &e.to_string()),
                            Err(_) => inner.mark_disconnected(generation, "liveness probe timed out"),
                        }
                    }
                    ConnectionState::Disconnected => inner.spawn_reconnect(),
                }
            }

            debug!("Broker monitor stopped");
        })
    }

    /// Drop the connection for good; later publishes fail
    pub fn close(&self) {
        let mut state = self.inner.state.write().unwrap_or_else(|e| e.into_inner());
        *state = ConnectionState::Closed;
        info!("Job broker client closed");
    }
}

#[async_trait]
impl<C: BrokerConnector> JobPublisher for QueueClient<C> {
    async fn publish(&self, queue: &str, job: &Job) -> Result<(), QueueError> {
        QueueClient::publish(self, queue, job).await
    }

    fn is_connected(&self) -> bool {
        QueueClient::is_connected(self)
    }
}

fn closed() -> QueueError {
    QueueError::BrokerUnavailable("queue client is closed".to_string())
}

impl<C: BrokerConnector> Inner<C> {
    fn snapshot(&self) -> ConnectionState<C::Channel> {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Store a fresh channel unless the client was closed meanwhile
    fn install(&self, channel: C::Channel) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if matches!(*state, ConnectionState::Closed) {
            return false;
        }
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        *state = ConnectionState::Connected { channel, generation };
        true
    }

    /// Drop the channel tagged `generation`; a failure seen on an older
    /// channel leaves a newer one in place
    fn mark_disconnected(self: &Arc<Self>, generation: u64, reason: &str) {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            let current = matches!(
                *state,
                ConnectionState::Connected { generation: installed, .. } if installed == generation
            );
            if !current {
                debug!(generation, reason, "Ignoring failure on a replaced broker channel");
                return;
            }
            *state = ConnectionState::Disconnected;
        }

        warn!(reason, "Lost connection to job broker");
        self.spawn_reconnect();
    }

    /// Start a background reconnection cycle unless one is running
    fn spawn_reconnect(self: &Arc<Self>) {
        let Some(guard) = CycleGuard::acquire(&self.reconnecting) else {
            debug!("Broker reconnection already in progress");
            return;
        };

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = inner.connect_with_retry().await {
                error!(error = %e, "Broker reconnection cycle failed");
            }
        });
    }

    async fn connect_with_retry(&self) -> Result<(), QueueError> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            if matches!(self.snapshot(), ConnectionState::Closed) {
                return Err(closed());
            }

            match self.open_channel().await {
                Ok(channel) => {
                    if !self.install(channel) {
                        return Err(closed());
                    }
                    info!(attempt, queues = ?self.queues, "Connected to job broker");
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Job broker connection attempt failed"
                    );
                    last_error = e.to_string();

                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.backoff.next_delay(attempt)).await;
                    }
                }
            }
        }

        error!(attempts = self.max_attempts, error = %last_error, "Giving up on job broker connection");
        Err(QueueError::ConnectFailed {
            attempts: self.max_attempts,
            last_error,
        })
    }

    async fn open_channel(&self) -> Result<C::Channel, BrokerError> {
        let channel = timeout(self.publish_timeout, self.connector.connect())
            .await
            .map_err(|_| BrokerError::ConnectionLost("connect timed out".to_string()))??;
        self.declare_queues(&channel).await?;
        Ok(channel)
    }

    async fn declare_queues(&self, channel: &C::Channel) -> Result<(), BrokerError> {
        for queue in &self.queues {
            channel.declare_durable_queue(queue).await?;
            debug!(queue = %queue, "Declared durable queue");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Language;
    use crate::test_utils::FakeBroker;
    use uuid::Uuid;

    fn client(broker: &FakeBroker, attempts: u32) -> QueueClient<FakeBroker> {
        QueueClient::new(
            broker.clone(),
            vec!["submission_queue".to_string(), "test_queue".to_string()],
            Box::new(FixedBackoff::new(Duration::from_secs(5))),
            attempts,
            Duration::from_secs(5),
        )
    }

    fn job() -> Job {
        Job {
            submission_id: Uuid::new_v4(),
            problem_id: Uuid::new_v4(),
            source_code: "print(1)".to_string(),
            language: Language::Python,
            time_limit: 5,
            memory_limit: 256,
            is_test: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_retries_until_broker_answers() {
        let broker = FakeBroker::default();
        broker.fail_next_connects(2);
        let client = client(&broker, 5);

        client.connect().await.unwrap();

        assert!(client.is_connected());
        assert_eq!(broker.connect_count(), 3);
        assert_eq!(broker.declared(), vec!["submission_queue", "test_queue"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_gives_up_after_bound() {
        let broker = FakeBroker::default();
        broker.set_down(true);
        let client = client(&broker, 3);

        let err = client.connect().await.unwrap_err();

        assert!(matches!(err, QueueError::ConnectFailed { attempts: 3, .. }));
        assert_eq!(broker.connect_count(), 3);
        assert!(!client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_when_connected_redeclares_queues() {
        let broker = FakeBroker::default();
        let client = client(&broker, 5);

        client.connect().await.unwrap();
        client.connect().await.unwrap();

        assert_eq!(broker.connect_count(), 1);
        assert_eq!(broker.declared().len(), 4);
    }

    #[tokio::test]
    async fn test_publish_fails_fast_when_disconnected() {
        let broker = FakeBroker::default();
        let client = client(&broker, 5);

        let err = client.publish("submission_queue", &job()).await.unwrap_err();

        assert!(matches!(err, QueueError::BrokerUnavailable(_)));
        assert!(broker.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_appends_serialized_job() {
        let broker = FakeBroker::default();
        let client = client(&broker, 5);
        client.connect().await.unwrap();

        let job = job();
        client.publish("test_queue", &job).await.unwrap();

        let published = broker.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "test_queue");
        let decoded: Job = serde_json::from_str(&published[0].1).unwrap();
        assert_eq!(decoded, job);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_publish_is_not_silent() {
        let broker = FakeBroker::default();
        let client = client(&broker, 5);
        client.connect().await.unwrap();
        broker.set_rejecting(true);

        let err = client.publish("submission_queue", &job()).await.unwrap_err();

        assert!(matches!(err, QueueError::PublishRejected(_)));
        assert!(client.is_connected());
        assert!(broker.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_loss_starts_single_reconnect_cycle() {
        let broker = FakeBroker::default();
        let client = client(&broker, 5);
        client.connect().await.unwrap();
        broker.set_down(true);

        let first = client.publish("submission_queue", &job()).await.unwrap_err();
        let second = client.publish("submission_queue", &job()).await.unwrap_err();
        assert!(matches!(first, QueueError::BrokerUnavailable(_)));
        assert!(matches!(second, QueueError::BrokerUnavailable(_)));
        assert!(!client.is_connected());

        // One cycle makes its first attempt, then waits out the backoff
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(broker.connect_count(), 2);

        broker.set_down(false);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(client.is_connected());
        assert_eq!(broker.connect_count(), 3);
        client.publish("submission_queue", &job()).await.unwrap();
    }

    fn generation(client: &QueueClient<FakeBroker>) -> Option<u64> {
        match client.inner.snapshot() {
            ConnectionState::Connected { generation, .. } => Some(generation),
            _ => None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_channel_failure_keeps_new_connection() {
        let broker = FakeBroker::default();
        let client = client(&broker, 5);
        client.connect().await.unwrap();
        let stale = generation(&client).unwrap();

        client.inner.mark_disconnected(stale, "connection reset");
        tokio::time::sleep(Duration::from_secs(1)).await;
        let fresh = generation(&client).unwrap();
        assert_ne!(fresh, stale);
        assert_eq!(broker.connect_count(), 2);

        // A publish that snapshotted the old channel fails late
        client.inner.mark_disconnected(stale, "broken pipe");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(generation(&client), Some(fresh));
        assert_eq!(broker.connect_count(), 2);
        client.publish("submission_queue", &job()).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_detects_loss_and_recovers() {
        let broker = FakeBroker::default();
        let client = client(&broker, 2);
        client.connect().await.unwrap();
        let monitor = client.spawn_monitor(Duration::from_secs(15));

        broker.set_down(true);
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(!client.is_connected());

        // The first cycle exhausts its attempts; a later tick starts another
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!client.is_connected());
        broker.set_down(false);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(client.is_connected());

        client.close();
        let stopped = timeout(Duration::from_secs(30), monitor).await;
        assert!(stopped.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_client_refuses_work() {
        let broker = FakeBroker::default();
        let client = client(&broker, 5);
        client.connect().await.unwrap();

        client.close();

        assert!(!client.is_connected());
        assert!(matches!(
            client.publish("submission_queue", &job()).await,
            Err(QueueError::BrokerUnavailable(_))
        ));
        assert!(client.connect().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_usable_as_job_publisher() {
        let broker = FakeBroker::default();
        let client = client(&broker, 5);
        client.connect().await.unwrap();

        let publisher: Arc<dyn JobPublisher> = Arc::new(client);
        assert!(publisher.is_connected());
        publisher.publish("submission_queue", &job()).await.unwrap();
        assert_eq!(broker.published().len(), 1);
    }
}
