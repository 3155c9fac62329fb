use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use super::repository::{PersistenceError, Repository};
use crate::rates::models::{CurrencyRecord, Snapshot, UpdateDatetime};

pub(crate) const INSERT_UPDATE_DATETIME: &str = r#"
    INSERT INTO update_datetimes (update_datetime)
    VALUES ($1)
    RETURNING id, update_datetime
"#;

pub(crate) const SELECT_LATEST_UPDATE_DATETIME: &str = r#"
    SELECT id, update_datetime
    FROM update_datetimes
    ORDER BY id DESC
    LIMIT 1
"#;

pub(crate) const SELECT_CURRENCIES: &str = r#"
    SELECT
        m.num_code,
        m.char_code,
        mu.multiplier,
        m.name,
        v.currency_value AS value
    FROM currency_values v
    JOIN currency_metadata m ON m.num_code = v.info_num_code
    JOIN multipliers mu ON mu.id = m.multiplier_id
    WHERE v.update_datetime_id = $1
    ORDER BY m.name
"#;

/// Builds the single multi-row insert for a snapshot's values
pub(crate) fn insert_currencies_query(snapshot: &Snapshot, update_datetime_id: i32) -> QueryBuilder<'_, Postgres> {
    let mut builder =
        QueryBuilder::new("INSERT INTO currency_values (currency_value, update_datetime_id, info_num_code) ");

    builder.push_values(snapshot.iter(), |mut row, record| {
        row.push_bind(&record.value)
            .push_bind(update_datetime_id)
            .push_bind(record.num_code);
    });

    builder
}

/// Repository backed by PostgreSQL
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn insert_update_datetime(&self, timestamp: &str) -> Result<UpdateDatetime, PersistenceError> {
        let update = sqlx::query_as::<_, UpdateDatetime>(INSERT_UPDATE_DATETIME)
            .bind(timestamp)
            .fetch_one(&self.pool)
            .await
            .map_err(PersistenceError::query("insert update datetime"))?;

        debug!("Inserted update datetime id={} at {}", update.id, update.update_datetime);

        Ok(update)
    }

    async fn latest_update_datetime(&self) -> Result<Option<UpdateDatetime>, PersistenceError> {
        sqlx::query_as::<_, UpdateDatetime>(SELECT_LATEST_UPDATE_DATETIME)
            .fetch_optional(&self.pool)
            .await
            .map_err(PersistenceError::query("get latest update datetime"))
    }

    async fn insert_currencies(&self, snapshot: &Snapshot, update_datetime_id: i32) -> Result<(), PersistenceError> {
        if snapshot.is_empty() {
            return Err(PersistenceError::EmptySnapshot);
        }

        let result = insert_currencies_query(snapshot, update_datetime_id)
            .build()
            .execute(&self.pool)
            .await
            .map_err(PersistenceError::query("insert currencies"))?;

        debug!(
            "Inserted {} currency values for update datetime id={}",
            result.rows_affected(),
            update_datetime_id
        );

        Ok(())
    }

    async fn latest_currencies(&self, update_datetime_id: i32) -> Result<Snapshot, PersistenceError> {
        let records = sqlx::query_as::<_, CurrencyRecord>(SELECT_CURRENCIES)
            .bind(update_datetime_id)
            .fetch_all(&self.pool)
            .await
            .map_err(PersistenceError::query("get latest currencies"))?;

        Ok(Snapshot::new(records))
    }

    async fn insert_snapshot(&self, timestamp: &str, snapshot: &Snapshot) -> Result<UpdateDatetime, PersistenceError> {
        if snapshot.is_empty() {
            return Err(PersistenceError::EmptySnapshot);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(PersistenceError::query("begin snapshot transaction"))?;

        let update = sqlx::query_as::<_, UpdateDatetime>(INSERT_UPDATE_DATETIME)
            .bind(timestamp)
            .fetch_one(&mut *tx)
            .await
            .map_err(PersistenceError::query("insert update datetime"))?;

        insert_currencies_query(snapshot, update.id)
            .build()
            .execute(&mut *tx)
            .await
            .map_err(PersistenceError::query("insert currencies"))?;

        tx.commit()
            .await
            .map_err(PersistenceError::query("commit snapshot transaction"))?;

        info!(
            "Stored snapshot of {} currencies under update datetime id={}",
            snapshot.len(),
            update.id
        );

        Ok(update)
    }

    async fn health_check(&self) -> Result<(), PersistenceError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(PersistenceError::query("check database health"))?;

        Ok(())
    }
}
