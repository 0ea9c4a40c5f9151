//! Watchlist management and price change detection.

use std::fmt::Display;
use std::sync::Arc;

use log::debug;
use log::error;
use log::info;
use log::warn;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::link::canonicalize;
use crate::model::Notification;
use crate::model::Product;
use crate::model::Record;
use crate::model::Region;
use crate::model::UserId;
use crate::repository::Repository;
use crate::repository::error::DatabaseError;
use crate::service::error::ServiceError;
use crate::service::notifier::DeliveryPolicy;
use crate::service::notifier::NotificationReceiver;
use crate::service::notifier::Notifier;
use crate::source::ProductSource;
use crate::source::error::SourceError;

/// Tuning knobs of a [`WatchlistService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchlistOptions {
    /// Maximum number of records rescanned at the same time.
    pub rescan_concurrency: usize,
    /// Capacity of the notification conduit.
    pub notification_buffer: usize,
    pub delivery_policy: DeliveryPolicy,
}

impl Default for WatchlistOptions {
    fn default() -> Self {
        Self {
            rescan_concurrency: 16,
            notification_buffer: 64,
            delivery_policy: DeliveryPolicy::default(),
        }
    }
}

/// Counters of one rescan cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Records the cycle started with.
    pub checked: usize,
    /// Records whose price changed.
    pub changed: usize,
    /// Records that could not be scraped or written back.
    pub failed: usize,
    /// Notifications enqueued.
    pub notified: usize,
}

enum RescanOutcome {
    Unchanged,
    Changed { notified: usize },
    Unpersisted { notified: usize },
    Failed,
}

impl UpdateSummary {
    fn add(&mut self, outcome: RescanOutcome) {
        match outcome {
            RescanOutcome::Unchanged => {}
            RescanOutcome::Changed { notified } => {
                self.changed += 1;
                self.notified += notified;
            }
            RescanOutcome::Unpersisted { notified } => {
                self.changed += 1;
                self.failed += 1;
                self.notified += notified;
            }
            RescanOutcome::Failed => self.failed += 1,
        }
    }
}

/// Service for managing watchlists and publishing price changes.
///
/// Records are never cached: every operation reads the store again.
pub struct WatchlistService {
    core: Arc<WatchlistCore>,
    rescan_concurrency: usize,
}

/// State shared with the per-record rescan tasks.
struct WatchlistCore {
    repo: Arc<Repository>,
    source: Arc<dyn ProductSource>,
    notifier: Notifier,
}

impl WatchlistService {
    /// Creates a new watchlist service with its own notification conduit.
    pub fn new(
        repo: Arc<Repository>,
        source: Arc<dyn ProductSource>,
        options: WatchlistOptions,
    ) -> Self {
        info!(
            "Initializing WatchlistService (rescan concurrency {}, notification buffer {}, {:?}).",
            options.rescan_concurrency, options.notification_buffer, options.delivery_policy
        );
        Self {
            core: Arc::new(WatchlistCore {
                repo,
                source,
                notifier: Notifier::new(options.notification_buffer, options.delivery_policy),
            }),
            rescan_concurrency: options.rescan_concurrency.max(1),
        }
    }

    /// Subscribes `user` to the product behind `link`.
    ///
    /// A product seen for the first time is stored without notifying anyone.
    /// Otherwise the existing subscribers are notified if the freshly scraped
    /// price differs from the stored one, and `user` joins the record.
    ///
    /// # Errors
    /// * [`ServiceError::InvalidLink`] if the link cannot be canonicalized.
    /// * [`ServiceError::Internal`] if scraping or the store fails.
    pub async fn add_to_watchlist(&self, link: &str, user: UserId) -> Result<(), ServiceError> {
        let link = canonicalize(link)?;
        let repo = &self.core.repo;

        let scraped = self
            .core
            .scrape(&link)
            .await
            .map_err(|e| internal(&format!("Could not scrape {link}"), e))?;

        let stored = repo
            .record
            .get(&link)
            .await
            .map_err(|e| internal(&format!("Could not read record {link}"), e))?;

        let stored = match stored {
            Some(record) => record,
            None => match repo.record.insert(&scraped, user).await {
                Ok(()) => {
                    info!("User {user} started tracking new product {link}.");
                    return Ok(());
                }
                Err(DatabaseError::AlreadyExists { .. }) => {
                    debug!("Record {link} was created concurrently. Updating instead.");
                    repo.record
                        .get(&link)
                        .await
                        .map_err(|e| internal(&format!("Could not read record {link}"), e))?
                        .ok_or_else(|| {
                            internal("Record vanished after a concurrent insert", &link)
                        })?
                }
                Err(e) => return Err(internal(&format!("Could not insert record {link}"), e)),
            },
        };

        if !stored.product.same_price_as(&scraped) {
            info!(
                "Price of {link} changed: {} -> {}.",
                stored.product.rounded_price(),
                scraped.rounded_price()
            );
            self.core.notify_subscribers(&stored, &scraped).await;
        }

        repo.record
            .update_product(&scraped, Some(user))
            .await
            .map_err(|e| internal(&format!("Could not update record {link}"), e))?;

        info!("User {user} is tracking {link}.");
        Ok(())
    }

    /// Unsubscribes `user` from `link`. The record disappears with its last
    /// subscriber.
    ///
    /// # Errors
    /// * [`ServiceError::NotFound`] if the link is not tracked by `user`.
    /// * [`ServiceError::Internal`] if the store fails.
    pub async fn remove_from_watchlist(
        &self,
        link: &str,
        user: UserId,
    ) -> Result<(), ServiceError> {
        // Stored keys are canonical already; anything else is looked up verbatim.
        let link = canonicalize(link).unwrap_or_else(|_| link.to_string());

        match self.core.repo.record.remove_subscriber(&link, user).await {
            Ok(()) => {
                info!("User {user} stopped tracking {link}.");
                Ok(())
            }
            Err(DatabaseError::NotFound { link }) => Err(ServiceError::NotFound { link }),
            Err(e) => Err(internal(&format!("Could not remove user {user} from {link}"), e)),
        }
    }

    /// Products tracked by `user`.
    pub async fn get_user_watchlist(&self, user: UserId) -> Result<Vec<Product>, ServiceError> {
        let records = self
            .core
            .repo
            .record
            .select_by_subscriber(user)
            .await
            .map_err(|e| internal(&format!("Could not get watchlist of user {user}"), e))?;

        Ok(records.into_iter().map(|r| r.product).collect())
    }

    /// Searches the marketplace of `region`.
    ///
    /// # Errors
    /// * [`ServiceError::EmptyQuery`] for a blank query, without contacting the source.
    /// * [`ServiceError::Search`] if the source fails.
    pub async fn search(&self, query: &str, region: &Region) -> Result<Vec<Product>, ServiceError> {
        if query.trim().is_empty() {
            return Err(ServiceError::EmptyQuery);
        }
        Ok(self.core.source.search(query, region).await?)
    }

    /// Rescans every tracked record and notifies the subscribers of those
    /// whose price changed.
    ///
    /// Records are scraped concurrently, bounded by the configured rescan
    /// concurrency. Failures are logged per record and never abort the cycle.
    /// Returns once every record has been handled.
    pub async fn update(&self) -> UpdateSummary {
        let records = match self.core.repo.record.select_all().await {
            Ok(records) => records,
            Err(e) => {
                error!("Could not load records for rescan: {e}");
                return UpdateSummary::default();
            }
        };

        let mut summary = UpdateSummary {
            checked: records.len(),
            ..Default::default()
        };
        debug!("Rescanning {} records.", records.len());

        let semaphore = Arc::new(Semaphore::new(self.rescan_concurrency));
        let mut tasks = JoinSet::new();

        for record in records {
            let core = self.core.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return RescanOutcome::Failed;
                };
                core.rescan(record).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => summary.add(outcome),
                Err(e) => {
                    error!("Rescan task failed: {e}");
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Rescan finished: {} checked, {} changed, {} failed, {} notified.",
            summary.checked, summary.changed, summary.failed, summary.notified
        );
        summary
    }

    /// Takes the receiving end of the notification conduit.
    ///
    /// # Errors
    /// [`ServiceError::AlreadyListening`] if it was taken before.
    pub fn listen(&self) -> Result<NotificationReceiver, ServiceError> {
        self.core
            .notifier
            .take_receiver()
            .ok_or(ServiceError::AlreadyListening)
    }
}

impl WatchlistCore {
    /// Scrapes `link`, keying the result by the link that was requested.
    async fn scrape(&self, link: &str) -> Result<Product, SourceError> {
        let mut product = self.source.scrape(link).await?;
        product.link = link.to_string();
        Ok(product)
    }

    async fn rescan(&self, record: Record) -> RescanOutcome {
        let link = record.link();

        let scraped = match self.scrape(link).await {
            Ok(product) => product,
            Err(e) => {
                warn!("Could not rescan {link}: {e}");
                return RescanOutcome::Failed;
            }
        };

        if record.product.same_price_as(&scraped) {
            debug!("No price change for {link}.");
            return RescanOutcome::Unchanged;
        }

        info!(
            "Price of {link} changed: {} -> {}.",
            record.product.rounded_price(),
            scraped.rounded_price()
        );
        let notified = self.notify_subscribers(&record, &scraped).await;

        // Keep the old price so the next cycle announces the change again.
        if notified < record.subscribers.len() {
            warn!(
                "Delivered {notified} of {} notifications for {link}. Keeping the old price.",
                record.subscribers.len()
            );
            return RescanOutcome::Unpersisted { notified };
        }

        match self.repo.record.update_product(&scraped, None).await {
            Ok(()) => RescanOutcome::Changed { notified },
            Err(e) => {
                warn!("Could not store new price of {link}: {e}");
                RescanOutcome::Unpersisted { notified }
            }
        }
    }

    /// Sends one notification per subscriber of `record`, carrying `product`.
    async fn notify_subscribers(&self, record: &Record, product: &Product) -> usize {
        let mut notified = 0;
        for user in &record.subscribers {
            let notification = Notification {
                product: product.clone(),
                user_id: *user,
            };
            if self.notifier.notify(notification).await {
                notified += 1;
            }
        }
        notified
    }
}

fn internal(context: &str, e: impl Display) -> ServiceError {
    error!("{context}: {e}");
    ServiceError::Internal
}
