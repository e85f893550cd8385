//! Shared test helpers: a driver that records every call and can be told to fail.

#![allow(dead_code)]

use async_trait::async_trait;
use docstore_lifecycle::config::{StoreConfigInput, StoreOptions};
use docstore_lifecycle::db::{StoreClient, StoreDriver, StoreSession};
use docstore_lifecycle::error::{DbError, DbResult, StoreErrorKind};
use docstore_lifecycle::models::TransactionOptions;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const NAMESPACE: &str = "STORE.recording";

/// Driver operation that can be made to fail.
#[derive(Debug, Clone, Copy)]
pub enum FailPoint {
    Connect,
    StartSession,
    StartTransaction,
    Commit,
    Abort,
}

#[derive(Debug, Default)]
struct Failures {
    connect: AtomicBool,
    start_session: AtomicBool,
    start_transaction: AtomicBool,
    commit: AtomicBool,
    abort: AtomicBool,
}

impl Failures {
    fn flag(&self, point: FailPoint) -> &AtomicBool {
        match point {
            FailPoint::Connect => &self.connect,
            FailPoint::StartSession => &self.start_session,
            FailPoint::StartTransaction => &self.start_transaction,
            FailPoint::Commit => &self.commit,
            FailPoint::Abort => &self.abort,
        }
    }

    fn check(&self, point: FailPoint) -> DbResult<()> {
        if self.flag(point).load(Ordering::SeqCst) {
            return Err(DbError::store(
                NAMESPACE,
                StoreErrorKind::Other,
                format!("injected {:?} failure", point),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Calls {
    pub connects: AtomicUsize,
    pub sessions: AtomicUsize,
    pub starts: AtomicUsize,
    pub commits: AtomicUsize,
    pub aborts: AtomicUsize,
    pub last_url: Mutex<Option<String>>,
    /// Values published by committed transactions
    pub committed: Mutex<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    pub calls: Arc<Calls>,
    failures: Arc<Failures>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, point: FailPoint) {
        self.failures.flag(point).store(true, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.calls.connects.load(Ordering::SeqCst)
    }

    pub fn sessions(&self) -> usize {
        self.calls.sessions.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.calls.commits.load(Ordering::SeqCst)
    }

    pub fn aborts(&self) -> usize {
        self.calls.aborts.load(Ordering::SeqCst)
    }

    pub fn last_url(&self) -> Option<String> {
        self.calls.last_url.lock().unwrap().clone()
    }

    pub fn committed(&self) -> Vec<String> {
        self.calls.committed.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoreDriver for RecordingDriver {
    type Client = RecordingClient;

    fn namespace(&self) -> &'static str {
        NAMESPACE
    }

    async fn connect(&self, url: &str, _options: &StoreOptions) -> DbResult<RecordingClient> {
        self.calls.connects.fetch_add(1, Ordering::SeqCst);
        *self.calls.last_url.lock().unwrap() = Some(url.to_string());
        self.failures.check(FailPoint::Connect)?;
        Ok(RecordingClient {
            calls: Arc::clone(&self.calls),
            failures: Arc::clone(&self.failures),
        })
    }
}

#[derive(Debug)]
pub struct RecordingClient {
    calls: Arc<Calls>,
    failures: Arc<Failures>,
}

#[async_trait]
impl StoreClient for RecordingClient {
    type Session = RecordingSession;

    async fn start_session(&self, _options: &TransactionOptions) -> DbResult<RecordingSession> {
        self.calls.sessions.fetch_add(1, Ordering::SeqCst);
        self.failures.check(FailPoint::StartSession)?;
        Ok(RecordingSession {
            calls: Arc::clone(&self.calls),
            failures: Arc::clone(&self.failures),
            pending: Vec::new(),
        })
    }
}

#[derive(Debug)]
pub struct RecordingSession {
    calls: Arc<Calls>,
    failures: Arc<Failures>,
    pending: Vec<String>,
}

impl RecordingSession {
    /// Stage a value that becomes visible in `Calls::committed` on commit.
    pub async fn write(&mut self, value: impl Into<String>) -> DbResult<()> {
        tokio::task::yield_now().await;
        self.pending.push(value.into());
        Ok(())
    }
}

#[async_trait]
impl StoreSession for RecordingSession {
    async fn start_transaction(&mut self, _options: &TransactionOptions) -> DbResult<()> {
        self.calls.starts.fetch_add(1, Ordering::SeqCst);
        self.failures.check(FailPoint::StartTransaction)
    }

    async fn commit_transaction(&mut self) -> DbResult<()> {
        self.calls.commits.fetch_add(1, Ordering::SeqCst);
        self.failures.check(FailPoint::Commit)?;
        let pending = std::mem::take(&mut self.pending);
        self.calls.committed.lock().unwrap().extend(pending);
        Ok(())
    }

    async fn abort_transaction(&mut self) -> DbResult<()> {
        self.calls.aborts.fetch_add(1, Ordering::SeqCst);
        self.pending.clear();
        self.failures.check(FailPoint::Abort)
    }
}

/// Minimal input that passes connection validation.
pub fn connectable_input() -> StoreConfigInput {
    StoreConfigInput {
        database: Some("app".to_string()),
        ..Default::default()
    }
}

/// Write a model definition file, creating parent directories.
pub fn write_model(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}
