//! Background task that drains the notification conduit.

use std::sync::Arc;

use log::error;
use log::info;
use tokio::task::JoinHandle;

use crate::model::Notification;
use crate::service::NotificationReceiver;
use crate::subscriber::Subscriber;

/// Forwards every notification from the conduit to a subscriber.
pub struct NotificationDispatcher {
    receiver: NotificationReceiver,
    subscriber: Arc<dyn Subscriber<Notification> + Send + Sync>,
}

impl NotificationDispatcher {
    pub fn new(
        receiver: NotificationReceiver,
        subscriber: Arc<dyn Subscriber<Notification> + Send + Sync>,
    ) -> Self {
        Self {
            receiver,
            subscriber,
        }
    }

    /// Consumes notifications until the conduit closes. Returns how many were
    /// delivered to the subscriber without error.
    pub async fn run(mut self) -> usize {
        let mut delivered = 0;
        while let Some(notification) = self.receiver.recv().await {
            let user = notification.user_id;
            let link = notification.product.link.clone();
            match self.subscriber.callback(notification).await {
                Ok(()) => delivered += 1,
                Err(e) => error!("Failed to deliver notification for {link} to user {user}: {e:?}"),
            }
        }
        info!("Notification conduit closed after {delivered} deliveries.");
        delivered
    }

    pub fn spawn(self) -> JoinHandle<usize> {
        tokio::spawn(self.run())
    }
}
