use anyhow::Result;
use log::info;

use super::Subscriber;
use crate::model::Notification;

/// Writes every price change to the log. Used when no chat transport is
/// attached.
pub struct LogSubscriber;

impl LogSubscriber {
    pub fn new() -> Self {
        info!("Initializing LogSubscriber.");
        Self
    }
}

/// User-facing text of a price change.
pub fn notification_message(notification: &Notification) -> String {
    let product = &notification.product;
    format!(
        "{} has changed price! New price is {:.2}!\n{}",
        product.title,
        product.rounded_price(),
        product.link
    )
}

#[async_trait::async_trait]
impl Subscriber<Notification> for LogSubscriber {
    async fn callback(&self, event: Notification) -> Result<()> {
        info!(
            "Notify user {}: {}",
            event.user_id,
            notification_message(&event).replace('\n', " ")
        );
        Ok(())
    }
}
