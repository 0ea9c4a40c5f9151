//! Database table operations and implementations.

use std::sync::Arc;

use log::warn;
use sqlx::SqliteConnection;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::model::Product;
use crate::model::Record;
use crate::model::UserId;
use crate::repository::error::DatabaseError;

/// Base table struct providing database pool access.
#[derive(Clone)]
pub struct BaseTable {
    pub pool: SqlitePool,
}

impl BaseTable {
    /// Creates a new base table with the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Base trait for table operations.
#[async_trait::async_trait]
pub trait TableBase {
    /// Drops the table.
    async fn drop_table(&self) -> Result<(), DatabaseError>;
    /// Deletes all rows from the table.
    async fn delete_all(&self) -> Result<(), DatabaseError>;
}

/// Watchlist records keyed by canonical product link.
///
/// Values are opaque JSON blobs of [`Record`]. There are no secondary indexes,
/// so lookups by subscriber scan the whole table.
#[derive(Clone)]
pub struct RecordTable {
    base: BaseTable,
    /// SQLite allows a single writer; every read-modify-write holds this for
    /// the lifetime of its transaction.
    write_lock: Arc<Mutex<()>>,
}

impl RecordTable {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            base: BaseTable::new(pool),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn get(&self, link: &str) -> Result<Option<Record>, DatabaseError> {
        let data: Option<Vec<u8>> = sqlx::query_scalar("SELECT data FROM records WHERE link = ?")
            .bind(link)
            .fetch_optional(&self.base.pool)
            .await?;

        data.map(|bytes| decode(&bytes)).transpose()
    }

    /// Creates a record for a link that is not tracked yet.
    ///
    /// # Errors
    /// [`DatabaseError::AlreadyExists`] if the link already has a record.
    pub async fn insert(&self, product: &Product, subscriber: UserId) -> Result<(), DatabaseError> {
        let record = Record::new(product.clone(), subscriber);
        let data = encode(&record)?;

        let _guard = self.write_lock.lock().await;
        let result = sqlx::query("INSERT INTO records (link, data) VALUES (?, ?)")
            .bind(&product.link)
            .bind(data)
            .execute(&self.base.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(DatabaseError::AlreadyExists {
                    link: product.link.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the stored product, adding `subscriber` to the record when
    /// given and not already present.
    ///
    /// # Errors
    /// [`DatabaseError::NotFound`] if the link has no record.
    pub async fn update_product(
        &self,
        product: &Product,
        subscriber: Option<UserId>,
    ) -> Result<(), DatabaseError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.base.pool.begin().await?;

        let mut record = select_for_update(&mut tx, &product.link)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                link: product.link.clone(),
            })?;

        record.product = product.clone();
        if let Some(subscriber) = subscriber {
            record.subscribers.insert(subscriber);
        }

        write(&mut tx, &record).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Removes `subscriber` from the record of `link`, deleting the record
    /// once nobody is subscribed to it.
    ///
    /// # Errors
    /// [`DatabaseError::NotFound`] if the link has no record or the
    /// subscriber is not part of it.
    pub async fn remove_subscriber(
        &self,
        link: &str,
        subscriber: UserId,
    ) -> Result<(), DatabaseError> {
        let not_found = || DatabaseError::NotFound {
            link: link.to_string(),
        };

        let _guard = self.write_lock.lock().await;
        let mut tx = self.base.pool.begin().await?;

        let mut record = select_for_update(&mut tx, link).await?.ok_or_else(not_found)?;
        if !record.subscribers.remove(&subscriber) {
            return Err(not_found());
        }

        if record.subscribers.is_empty() {
            sqlx::query("DELETE FROM records WHERE link = ?")
                .bind(link)
                .execute(&mut *tx)
                .await?;
        } else {
            write(&mut tx, &record).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Every decodable record, ordered by link.
    pub async fn select_all(&self) -> Result<Vec<Record>, DatabaseError> {
        let rows: Vec<(String, Vec<u8>)> =
            sqlx::query_as("SELECT link, data FROM records ORDER BY link")
                .fetch_all(&self.base.pool)
                .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(link, data)| match decode(&data) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping undecodable record `{link}`: {e}");
                    None
                }
            })
            .collect())
    }

    pub async fn select_by_subscriber(
        &self,
        subscriber: UserId,
    ) -> Result<Vec<Record>, DatabaseError> {
        Ok(self
            .select_all()
            .await?
            .into_iter()
            .filter(|record| record.has_subscriber(subscriber))
            .collect())
    }

    pub async fn count(&self) -> Result<u64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.base.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait::async_trait]
impl TableBase for RecordTable {
    async fn drop_table(&self) -> Result<(), DatabaseError> {
        sqlx::query("DROP TABLE IF EXISTS records")
            .execute(&self.base.pool)
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), DatabaseError> {
        let _guard = self.write_lock.lock().await;
        sqlx::query("DELETE FROM records")
            .execute(&self.base.pool)
            .await?;
        Ok(())
    }
}

async fn select_for_update(
    conn: &mut SqliteConnection,
    link: &str,
) -> Result<Option<Record>, DatabaseError> {
    let data: Option<Vec<u8>> = sqlx::query_scalar("SELECT data FROM records WHERE link = ?")
        .bind(link)
        .fetch_optional(&mut *conn)
        .await?;

    data.map(|bytes| decode(&bytes)).transpose()
}

async fn write(conn: &mut SqliteConnection, record: &Record) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE records SET data = ? WHERE link = ?")
        .bind(encode(record)?)
        .bind(record.link())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

fn encode(record: &Record) -> Result<Vec<u8>, DatabaseError> {
    Ok(serde_json::to_vec(record)?)
}

fn decode(bytes: &[u8]) -> Result<Record, DatabaseError> {
    Ok(serde_json::from_slice(bytes)?)
}
