use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::models::{CurrencyMetadata, CurrencyValue};
use super::repository::{PersistenceError, Repository};
use crate::rates::models::{CurrencyRecord, Snapshot, UpdateDatetime};

#[derive(Debug, Default)]
struct Tables {
    metadata: HashMap<i32, CurrencyMetadata>,
    updates: Vec<UpdateDatetime>,
    values: Vec<CurrencyValue>,
}

/// Repository kept entirely in process memory.
///
/// Mirrors the relational layout: value rows must reference seeded metadata
/// and an existing update row.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(metadata: impl IntoIterator<Item = CurrencyMetadata>) -> Self {
        let tables = Tables {
            metadata: metadata.into_iter().map(|m| (m.num_code, m)).collect(),
            ..Tables::default()
        };

        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    pub async fn update_count(&self) -> usize {
        self.tables.read().await.updates.len()
    }

    pub async fn value_count(&self) -> usize {
        self.tables.read().await.values.len()
    }
}

impl Tables {
    fn next_update_id(&self) -> i32 {
        self.updates.last().map_or(1, |u| u.id + 1)
    }

    fn check_values(&self, snapshot: &Snapshot, update_datetime_id: i32) -> Result<(), PersistenceError> {
        if snapshot.is_empty() {
            return Err(PersistenceError::EmptySnapshot);
        }

        if !self.updates.iter().any(|u| u.id == update_datetime_id) {
            return Err(PersistenceError::UnknownUpdate(update_datetime_id));
        }

        match snapshot.iter().find(|r| !self.metadata.contains_key(&r.num_code)) {
            Some(record) => Err(PersistenceError::MissingMetadata {
                num_code: record.num_code,
                char_code: record.char_code.clone(),
            }),
            None => Ok(()),
        }
    }

    fn push_values(&mut self, snapshot: &Snapshot, update_datetime_id: i32) {
        self.values.extend(snapshot.iter().map(|record| CurrencyValue {
            info_num_code: record.num_code,
            update_datetime_id,
            currency_value: record.value.clone(),
        }));
    }

    fn push_update(&mut self, timestamp: &str) -> UpdateDatetime {
        let update = UpdateDatetime::new(self.next_update_id(), timestamp);
        self.updates.push(update.clone());
        update
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert_update_datetime(&self, timestamp: &str) -> Result<UpdateDatetime, PersistenceError> {
        Ok(self.tables.write().await.push_update(timestamp))
    }

    async fn latest_update_datetime(&self) -> Result<Option<UpdateDatetime>, PersistenceError> {
        let tables = self.tables.read().await;
        Ok(tables.updates.iter().max_by_key(|u| u.id).cloned())
    }

    async fn insert_currencies(&self, snapshot: &Snapshot, update_datetime_id: i32) -> Result<(), PersistenceError> {
        let mut tables = self.tables.write().await;
        tables.check_values(snapshot, update_datetime_id)?;
        tables.push_values(snapshot, update_datetime_id);
        Ok(())
    }

    async fn latest_currencies(&self, update_datetime_id: i32) -> Result<Snapshot, PersistenceError> {
        let tables = self.tables.read().await;

        let mut records: Vec<CurrencyRecord> = tables
            .values
            .iter()
            .filter(|v| v.update_datetime_id == update_datetime_id)
            .filter_map(|v| {
                tables.metadata.get(&v.info_num_code).map(|m| CurrencyRecord {
                    num_code: m.num_code,
                    char_code: m.char_code.clone(),
                    multiplier: m.multiplier,
                    name: m.name.clone(),
                    value: v.currency_value.clone(),
                })
            })
            .collect();

        records.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Snapshot::new(records))
    }

    async fn insert_snapshot(&self, timestamp: &str, snapshot: &Snapshot) -> Result<UpdateDatetime, PersistenceError> {
        let mut tables = self.tables.write().await;

        // Validate against a provisional id so a rejected snapshot leaves no update row
        let id = tables.next_update_id();
        tables.updates.push(UpdateDatetime::new(id, timestamp));
        if let Err(e) = tables.check_values(snapshot, id) {
            tables.updates.pop();
            return Err(e);
        }
        tables.push_values(snapshot, id);

        Ok(UpdateDatetime::new(id, timestamp))
    }

    async fn health_check(&self) -> Result<(), PersistenceError> {
        Ok(())
    }
}
