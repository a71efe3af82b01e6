use common::domain::{DomainError, DomainResult, LiveEvent, LiveNotifier};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_NOTIFICATION_QUEUE_CAPACITY: usize = 1024;

/// Producer side of the live notification pipeline.
///
/// Publishing never waits: the pipeline must not stall because an observer
/// is slow, so events are dropped with a warning when the queue is full.
#[derive(Clone)]
pub struct NotificationQueue {
    sender: mpsc::Sender<LiveEvent>,
}

/// Consumer side: drains queued events into the notifier
pub struct NotificationWorker {
    receiver: mpsc::Receiver<LiveEvent>,
    notifier: Arc<dyn LiveNotifier>,
}

impl NotificationQueue {
    /// Create a queue bounded to `capacity` events (at least one)
    pub fn new(capacity: usize, notifier: Arc<dyn LiveNotifier>) -> (Self, NotificationWorker) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self { sender },
            NotificationWorker { receiver, notifier },
        )
    }

    pub fn try_publish(&self, event: LiveEvent) -> DomainResult<()> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => DomainError::NotificationQueueFull,
            TrySendError::Closed(_) => DomainError::NotificationQueueClosed,
        })
    }

    /// Publish best effort, logging and dropping the event on failure
    pub fn publish(&self, event: LiveEvent) {
        let kind = event.kind();
        if let Err(e) = self.try_publish(event) {
            warn!(kind = kind, error = %e, "dropping live notification");
        }
    }
}

impl NotificationWorker {
    /// Deliver events until cancelled or every producer is gone
    pub async fn run(mut self, token: CancellationToken) -> anyhow::Result<()> {
        info!("notification worker started");

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("notification worker cancelled");
                    break;
                }
                event = self.receiver.recv() => {
                    let Some(event) = event else {
                        info!("notification queue closed");
                        break;
                    };
                    self.deliver(event).await;
                }
            }
        }

        Ok(())
    }

    async fn deliver(&self, event: LiveEvent) {
        let kind = event.kind();
        match self.notifier.notify(event).await {
            Ok(()) => debug!(kind = kind, "live notification delivered"),
            Err(e) => warn!(kind = kind, error = %e, "live notification failed"),
        }
    }
}
