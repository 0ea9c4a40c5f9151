//! Wiring of the repository, the watchlist service and its background tasks.
//!
//! The embedding binary provides the scraper and the notification consumer,
//! builds an [`App`] and hands control to [`App::run`].

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use log::debug;
use log::info;

use crate::config::Config;
use crate::model::Notification;
use crate::repository::Repository;
use crate::service::WatchlistService;
use crate::source::ProductSource;
use crate::source::allowed_domains::AllowedDomains;
use crate::subscriber::Subscriber;
use crate::task::notification_dispatcher::NotificationDispatcher;
use crate::task::rescan_task::RescanTask;

pub struct App {
    config: Arc<Config>,
    repo: Arc<Repository>,
    service: Arc<WatchlistService>,
    init_start: Instant,
}

impl App {
    pub async fn new(config: Arc<Config>, source: Arc<dyn ProductSource>) -> Result<Self> {
        let init_start = Instant::now();

        let repo = setup_database(&config, init_start).await?;
        let source: Arc<dyn ProductSource> =
            Arc::new(AllowedDomains::new(source, &config.allowed_domains));

        debug!("Setting up WatchlistService...");
        let service = Arc::new(WatchlistService::new(
            repo.clone(),
            source,
            config.watchlist_options(),
        ));

        Ok(Self {
            config,
            repo,
            service,
            init_start,
        })
    }

    /// The service, for the presentation layer to call into.
    pub fn service(&self) -> Arc<WatchlistService> {
        self.service.clone()
    }

    /// Starts delivering notifications to `subscriber` and rescanning every
    /// poll interval, then waits for Ctrl+C.
    pub async fn run(
        self,
        subscriber: Arc<dyn Subscriber<Notification> + Send + Sync>,
    ) -> Result<()> {
        debug!("Setting up NotificationDispatcher...");
        let receiver = self.service.listen()?;
        let dispatcher = NotificationDispatcher::new(receiver, subscriber).spawn();

        let rescan = RescanTask::new(self.service.clone(), self.config.poll_interval);
        rescan.clone().start()?;

        info!(
            "price-watch is up in {:.2}s. Press Ctrl+C to stop.",
            self.init_start.elapsed().as_secs_f64()
        );

        tokio::signal::ctrl_c().await?;
        info!("Ctrl+C received, shutting down.");

        rescan.stop()?;
        dispatcher.abort();
        self.repo.close().await;
        Ok(())
    }
}

async fn setup_database(config: &Config, init_start: Instant) -> Result<Arc<Repository>> {
    debug!("Setting up Repository...");
    let repo = Arc::new(Repository::new(&config.db_url, &config.db_path).await?);

    info!("Running database migrations...");
    repo.run_migrations().await?;
    info!(
        "Database setup complete ({:.2}s), {} products tracked.",
        init_start.elapsed().as_secs_f64(),
        repo.record.count().await?
    );

    Ok(repo)
}
