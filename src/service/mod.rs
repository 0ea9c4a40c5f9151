//! Watchlist engine: subscriptions, rescans and the notification conduit.

pub mod error;
pub mod notifier;
pub mod watchlist_service;

pub use notifier::DeliveryPolicy;
pub use notifier::NotificationReceiver;
pub use watchlist_service::UpdateSummary;
pub use watchlist_service::WatchlistOptions;
pub use watchlist_service::WatchlistService;
