//! Configuration loaded from the environment (and `.env`).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::service::DeliveryPolicy;
use crate::service::WatchlistOptions;

#[derive(Clone, Debug)]
pub struct Config {
    pub poll_interval: Duration,
    pub db_url: String,
    pub db_path: String,
    pub logs_path: PathBuf,
    /// Bare level for this crate, or a full `EnvFilter` directive.
    pub log_level: String,
    /// Daily log files kept on disk.
    pub log_files: usize,
    pub rescan_concurrency: usize,
    pub notification_buffer: usize,
    /// `None` blocks until the consumer makes room.
    pub notification_timeout: Option<Duration>,
    /// Hosts the product source may scrape. Empty allows every host.
    pub allowed_domains: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(25 * 60),
            db_url: "sqlite://data/price-watch.db".to_string(),
            db_path: "data/price-watch.db".to_string(),
            logs_path: PathBuf::from("logs"),
            log_level: "info".to_string(),
            log_files: 7,
            rescan_concurrency: 16,
            notification_buffer: 64,
            notification_timeout: None,
            allowed_domains: Vec::new(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the defaults with values from the environment.
    pub fn load(&mut self) -> Result<(), AppError> {
        let poll_secs = env_parse("POLL_INTERVAL", self.poll_interval.as_secs());
        self.poll_interval = Duration::from_secs(poll_secs);
        self.db_path = env_string("DB_PATH").unwrap_or_else(|| self.db_path.clone());
        self.db_url = env_string("DB_URL").unwrap_or_else(|| format!("sqlite://{}", self.db_path));
        if let Some(logs_path) = env_string("LOGS_PATH") {
            self.logs_path = PathBuf::from(logs_path);
        }
        self.log_level = env_string("LOG_LEVEL").unwrap_or_else(|| self.log_level.clone());
        self.log_files = env_parse("LOG_FILES", self.log_files);
        self.rescan_concurrency = env_parse("RESCAN_CONCURRENCY", self.rescan_concurrency);
        self.notification_buffer = env_parse("NOTIFICATION_BUFFER", self.notification_buffer);

        let timeout = env_parse(
            "NOTIFICATION_TIMEOUT",
            self.notification_timeout.map_or(0, |t| t.as_secs()),
        );
        self.notification_timeout = (timeout > 0).then(|| Duration::from_secs(timeout));

        if let Some(domains) = env_string("ALLOWED_DOMAINS") {
            self.allowed_domains = domains
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }

        if self.poll_interval.is_zero() {
            return Err(AppError::ConfigurationError {
                msg: "POLL_INTERVAL must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn watchlist_options(&self) -> WatchlistOptions {
        WatchlistOptions {
            rescan_concurrency: self.rescan_concurrency,
            notification_buffer: self.notification_buffer,
            delivery_policy: self
                .notification_timeout
                .map_or(DeliveryPolicy::Block, DeliveryPolicy::Timeout),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env_string(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
