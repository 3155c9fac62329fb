//! Mock implementations for testing

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::database::{InMemoryRepository, PersistenceError, Repository};
use crate::datafeed::fetcher::{FetchError, RateSource};
use crate::rates::models::{Snapshot, UpdateDatetime};

/// Source that replays a fixed script of fetch results
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<u8>, FetchError>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Result<Vec<u8>, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(body: Vec<u8>, times: usize) -> Self {
        Self::new((0..times).map(|_| Ok(body.clone())))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateSource for ScriptedSource {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::NetworkError("script exhausted".to_string())))
    }

    fn origin(&self) -> String {
        "scripted".to_string()
    }
}

/// Configuration for controlling mock failures
#[derive(Debug, Clone, Default)]
pub struct FailureConfig {
    pub fail_on_latest_update: bool,
    pub fail_on_insert: bool,
    pub fail_on_latest_currencies: bool,
    pub fail_after_calls: Option<usize>,
}

impl FailureConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_after(calls: usize) -> Self {
        Self {
            fail_after_calls: Some(calls),
            ..Default::default()
        }
    }

    pub fn fail_on_operation(operation: &str) -> Self {
        match operation {
            "latest_update" => Self {
                fail_on_latest_update: true,
                ..Default::default()
            },
            "insert" => Self {
                fail_on_insert: true,
                ..Default::default()
            },
            "latest_currencies" => Self {
                fail_on_latest_currencies: true,
                ..Default::default()
            },
            _ => Self::default(),
        }
    }
}

/// In-memory repository that can be told to fail
#[derive(Debug)]
pub struct MockRepository {
    inner: InMemoryRepository,
    failure_config: Mutex<FailureConfig>,
    calls: AtomicUsize,
}

impl MockRepository {
    pub fn new(inner: InMemoryRepository) -> Self {
        Self::with_failures(inner, FailureConfig::default())
    }

    pub fn with_failures(inner: InMemoryRepository, failure_config: FailureConfig) -> Self {
        Self {
            inner,
            failure_config: Mutex::new(failure_config),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &InMemoryRepository {
        &self.inner
    }

    pub fn set_failures(&self, failure_config: FailureConfig) {
        *self.failure_config.lock().unwrap() = failure_config;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, operation: &'static str, flag: impl Fn(&FailureConfig) -> bool) -> Result<(), PersistenceError> {
        let count = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let config = self.failure_config.lock().unwrap();

        let over_limit = config.fail_after_calls.is_some_and(|limit| count > limit);
        if flag(&config) || over_limit {
            return Err(PersistenceError::Query {
                operation,
                source: sqlx::Error::PoolTimedOut,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn insert_update_datetime(&self, timestamp: &str) -> Result<UpdateDatetime, PersistenceError> {
        self.check("insert update datetime", |c| c.fail_on_insert)?;
        self.inner.insert_update_datetime(timestamp).await
    }

    async fn latest_update_datetime(&self) -> Result<Option<UpdateDatetime>, PersistenceError> {
        self.check("get latest update datetime", |c| c.fail_on_latest_update)?;
        self.inner.latest_update_datetime().await
    }

    async fn insert_currencies(&self, snapshot: &Snapshot, update_datetime_id: i32) -> Result<(), PersistenceError> {
        self.check("insert currencies", |c| c.fail_on_insert)?;
        self.inner.insert_currencies(snapshot, update_datetime_id).await
    }

    async fn latest_currencies(&self, update_datetime_id: i32) -> Result<Snapshot, PersistenceError> {
        self.check("get latest currencies", |c| c.fail_on_latest_currencies)?;
        self.inner.latest_currencies(update_datetime_id).await
    }

    async fn insert_snapshot(&self, timestamp: &str, snapshot: &Snapshot) -> Result<UpdateDatetime, PersistenceError> {
        self.check("insert snapshot", |c| c.fail_on_insert)?;
        self.inner.insert_snapshot(timestamp, snapshot).await
    }

    async fn health_check(&self) -> Result<(), PersistenceError> {
        Ok(())
    }
}
