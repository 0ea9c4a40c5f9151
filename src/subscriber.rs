//! Consumers of the notifications published by the watchlist service.

pub mod log_subscriber;

use anyhow::Result;

/// Trait for event subscribers.
#[async_trait::async_trait]
pub trait Subscriber<E> {
    /// Called for every event handed to this subscriber.
    async fn callback(&self, event: E) -> Result<()>;
}
