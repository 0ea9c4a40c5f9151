//! The notification conduit between the watchlist service and its single
//! consumer.

use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use log::warn;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

use crate::model::Notification;

/// Receive-only end of the conduit.
pub type NotificationReceiver = mpsc::Receiver<Notification>;

/// What to do when the conduit is full.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Wait for the consumer indefinitely. A consumer that stops reading
    /// stalls every emitting task.
    #[default]
    Block,
    /// Wait at most this long, then drop the notification with a warning.
    /// A rescan that drops any notification keeps the old price stored, so
    /// the change is detected and announced again on the next cycle.
    Timeout(Duration),
}

/// Bounded single-reader channel of [`Notification`]s.
pub struct Notifier {
    tx: mpsc::Sender<Notification>,
    rx: Mutex<Option<NotificationReceiver>>,
    policy: DeliveryPolicy,
}

impl Notifier {
    pub fn new(buffer: usize, policy: DeliveryPolicy) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            policy,
        }
    }

    /// Hands out the receiver. Only the first call gets it.
    pub fn take_receiver(&self) -> Option<NotificationReceiver> {
        self.rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Enqueues a notification according to the delivery policy. Returns
    /// whether it was enqueued.
    pub async fn notify(&self, notification: Notification) -> bool {
        let user = notification.user_id;
        let closed = match self.policy {
            DeliveryPolicy::Block => self.tx.send(notification).await.is_err(),
            DeliveryPolicy::Timeout(timeout) => {
                match self.tx.send_timeout(notification, timeout).await {
                    Ok(()) => false,
                    Err(SendTimeoutError::Timeout(_)) => {
                        warn!("Notification consumer is not keeping up. Dropped one for user {user}.");
                        return false;
                    }
                    Err(SendTimeoutError::Closed(_)) => true,
                }
            }
        };

        if closed {
            warn!("Notification receiver is closed. Dropped notification for user {user}.");
        }
        !closed
    }
}
