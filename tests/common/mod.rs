//! Common test utilities and mock implementations.

#![allow(dead_code)]

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use price_watch::model::Notification;
use price_watch::model::Product;
use price_watch::model::Region;
use price_watch::repository::Repository;
use price_watch::service::NotificationReceiver;
use price_watch::source::ProductSource;
use price_watch::source::error::SourceError;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Sets up a temporary test database.
pub async fn setup_db() -> (Arc<Repository>, PathBuf) {
    let uuid = Uuid::new_v4();
    let db_path = std::env::temp_dir().join(format!("price-watch-test-{}.db", uuid));
    let db_url = format!("sqlite://{}", db_path.to_str().unwrap());

    let db = Repository::new(&db_url, db_path.to_str().unwrap())
        .await
        .expect("Failed to create database");

    db.run_migrations().await.expect("Failed to run migrations");

    (Arc::new(db), db_path)
}

/// Cleans up the test database file.
pub async fn teardown_db(db_path: PathBuf) {
    for suffix in ["", "-wal", "-shm"] {
        let path = PathBuf::from(format!("{}{}", db_path.display(), suffix));
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Builds a product as a scrape of `link` would return it.
pub fn product(link: &str, price: &str) -> Product {
    Product {
        title: format!("Product {}", link.rsplit('/').next().unwrap_or_default()),
        image: format!("{link}/image.jpg"),
        link: link.to_string(),
        price: dec(price),
        checked_at: Utc::now(),
    }
}

/// Pulls every notification currently queued.
pub fn drain(rx: &mut NotificationReceiver) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

// MOCK SOURCE

/// State for the mock source.
#[derive(Default)]
pub struct MockSourceState {
    pub prices: HashMap<String, Decimal>,
    pub failing: HashSet<String>,
    pub search_results: Vec<Product>,
    pub delay: Option<Duration>,
}

/// Mock product source for testing.
#[derive(Default)]
pub struct MockSource {
    pub state: RwLock<MockSourceState>,
    scrapes: AtomicUsize,
    searches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sets the price the next scrapes of `link` will report.
    pub fn set_price(&self, link: &str, price: &str) {
        let mut state = self.state.write().unwrap();
        state.failing.remove(link);
        state.prices.insert(link.to_string(), dec(price));
    }

    /// Makes scrapes of `link` fail.
    pub fn fail(&self, link: &str) {
        self.state.write().unwrap().failing.insert(link.to_string());
    }

    pub fn set_search_results(&self, products: Vec<Product>) {
        self.state.write().unwrap().search_results = products;
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.write().unwrap().delay = Some(delay);
    }

    pub fn scrape_count(&self) -> usize {
        self.scrapes.load(Ordering::SeqCst)
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductSource for MockSource {
    async fn scrape(&self, link: &str) -> Result<Product, SourceError> {
        self.scrapes.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self.state.read().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let state = self.state.read().unwrap();
            if state.failing.contains(link) {
                Err(SourceError::UnexpectedResult {
                    message: format!("scrape of {link} failed"),
                })
            } else if let Some(price) = state.prices.get(link) {
                Ok(Product {
                    price: *price,
                    ..product(link, "0")
                })
            } else {
                Err(SourceError::NotFound {
                    link: link.to_string(),
                })
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn search(&self, _query: &str, _region: &Region) -> Result<Vec<Product>, SourceError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.read().unwrap().search_results.clone())
    }
}
