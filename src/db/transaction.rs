//! Transaction coordination.
//!
//! Wraps a unit of work in a store-native session with transactional semantics.
//! Each invocation owns its session exclusively and settles it exactly once:
//! either the commit or the rollback takes effect, never both, and any further
//! settlement call is a silent no-op.
//!
//! Abort failures never replace the error that triggered the rollback; the
//! caller always observes the original error.

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::db::driver::{StoreClient, StoreSession};
use crate::error::{DbError, DbResult};
use crate::models::{TransactionMetadata, TransactionOptions, TransactionState};

struct ActiveEntry {
    created_at: Instant,
    started_at: DateTime<Utc>,
}

/// In-flight transactions, for introspection.
#[derive(Clone, Default)]
pub struct ActiveTransactions {
    entries: Arc<Mutex<HashMap<String, ActiveEntry>>>,
}

impl std::fmt::Debug for ActiveTransactions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveTransactions")
            .field("count", &self.count())
            .finish()
    }
}

impl ActiveTransactions {
    pub fn new() -> Self {
        Self::default()
    }

    fn track(&self, transaction_id: &str, started_at: DateTime<Utc>) -> TrackedTransaction {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            transaction_id.to_string(),
            ActiveEntry {
                created_at: Instant::now(),
                started_at,
            },
        );
        TrackedTransaction {
            transaction_id: transaction_id.to_string(),
            entries: Arc::clone(&self.entries),
        }
    }

    /// List all in-flight transactions with their metadata.
    pub fn list_all(&self) -> Vec<TransactionMetadata> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<TransactionMetadata> = entries
            .iter()
            .map(|(id, entry)| TransactionMetadata {
                transaction_id: id.clone(),
                started_at: entry.started_at,
                duration_secs: entry.created_at.elapsed().as_secs(),
            })
            .collect();
        list.sort_by_key(|m| m.started_at);
        list
    }

    /// Get the number of in-flight transactions.
    pub fn count(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.len()
    }
}

/// Removes its entry from the active set when dropped.
struct TrackedTransaction {
    transaction_id: String,
    entries: Arc<Mutex<HashMap<String, ActiveEntry>>>,
}

impl Drop for TrackedTransaction {
    fn drop(&mut self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&self.transaction_id);
    }
}

/// A session bound to one coordinator invocation.
///
/// Dereferences to the driver session so the unit of work can run store
/// operations scoped to the transaction.
pub struct TransactionSession<S: StoreSession> {
    transaction_id: String,
    inner: S,
    state: TransactionState,
    started_at: DateTime<Utc>,
    _tracked: TrackedTransaction,
}

impl<S: StoreSession> std::fmt::Debug for TransactionSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionSession")
            .field("transaction_id", &self.transaction_id)
            .field("state", &self.state)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

impl<S: StoreSession> TransactionSession<S> {
    pub fn id(&self) -> &str {
        &self.transaction_id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_settled(&self) -> bool {
        self.state.is_settled()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Commit the transaction. No-op once the session is settled.
    pub async fn commit(&mut self) -> DbResult<()> {
        if self.state.is_settled() {
            debug!(transaction_id = %self.transaction_id, state = ?self.state, "Commit ignored, already settled");
            return Ok(());
        }
        self.state = TransactionState::Committing;

        match self.inner.commit_transaction().await {
            Ok(()) => {
                self.state = TransactionState::Committed;
                info!(transaction_id = %self.transaction_id, "Transaction committed");
                Ok(())
            }
            Err(e) => {
                self.state = TransactionState::CommitFailed;
                warn!(transaction_id = %self.transaction_id, error = %e, "Transaction commit failed");
                Err(e)
            }
        }
    }

    /// Roll the transaction back. No-op once the session is settled.
    ///
    /// Abort errors are logged and swallowed.
    pub async fn rollback(&mut self) {
        if self.state.is_settled() {
            debug!(transaction_id = %self.transaction_id, state = ?self.state, "Rollback ignored, already settled");
            return;
        }
        self.state = TransactionState::RollingBack;

        if let Err(e) = self.inner.abort_transaction().await {
            warn!(transaction_id = %self.transaction_id, error = %e, "Abort failed during rollback");
        }
        self.state = TransactionState::RolledBack;
        info!(transaction_id = %self.transaction_id, "Transaction rolled back");
    }
}

impl<S: StoreSession> Deref for TransactionSession<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S: StoreSession> DerefMut for TransactionSession<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

/// Runs units of work inside guarded transactions.
#[derive(Debug, Clone)]
pub struct TransactionCoordinator {
    store: String,
    active: ActiveTransactions,
}

impl TransactionCoordinator {
    pub fn new(store: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            active: ActiveTransactions::new(),
        }
    }

    pub fn active(&self) -> &ActiveTransactions {
        &self.active
    }

    /// In-flight transactions, oldest first.
    pub fn list_active(&self) -> Vec<TransactionMetadata> {
        self.active.list_all()
    }

    pub fn active_count(&self) -> usize {
        self.active.count()
    }

    /// Start a session and a transaction on it.
    pub async fn begin<C: StoreClient>(
        &self,
        client: &C,
        options: &TransactionOptions,
    ) -> DbResult<TransactionSession<C::Session>> {
        let mut inner = client.start_session(options).await?;
        inner.start_transaction(options).await?;

        let transaction_id = generate_transaction_id();
        let started_at = Utc::now();
        let tracked = self.active.track(&transaction_id, started_at);

        info!(
            store = %self.store,
            transaction_id = %transaction_id,
            read_concern = ?options.read_concern,
            timeout = ?options.timeout,
            "Transaction started"
        );

        Ok(TransactionSession {
            transaction_id,
            inner,
            state: TransactionState::Active,
            started_at,
            _tracked: tracked,
        })
    }

    /// Run `unit_of_work` inside a transaction.
    ///
    /// Resolves with the unit of work's value after a successful commit. If the unit
    /// of work fails (or exceeds `options.timeout`) the transaction is rolled back
    /// and that error is returned; a failed commit returns the commit error.
    ///
    /// A unit of work that commits the session itself and then exceeds the timeout
    /// gets `DbError::Transaction("timed out after commit")`. Nothing is rolled back
    /// in that case: the writes are committed, or the commit was already in flight
    /// when the future was dropped.
    pub async fn run<C, F, R, E>(
        &self,
        client: &C,
        options: TransactionOptions,
        unit_of_work: F,
    ) -> Result<R, E>
    where
        C: StoreClient,
        F: for<'s> FnOnce(&'s mut TransactionSession<C::Session>) -> BoxFuture<'s, Result<R, E>>
            + Send,
        R: Send,
        E: From<DbError> + Send,
    {
        let mut session = self.begin(client, &options).await.map_err(E::from)?;
        let transaction_id = session.id().to_string();

        let outcome = match options.timeout {
            Some(limit) => {
                let timed = tokio::time::timeout(limit, unit_of_work(&mut session)).await;
                match timed {
                    Ok(outcome) => outcome,
                    Err(_) => match session.state() {
                        TransactionState::Committing | TransactionState::Committed => {
                            warn!(
                                store = %self.store,
                                transaction_id = %transaction_id,
                                timeout = ?limit,
                                state = ?session.state(),
                                "Unit of work timed out after commit"
                            );
                            return Err(E::from(DbError::transaction(
                                "timed out after commit",
                                transaction_id,
                            )));
                        }
                        _ => {
                            warn!(
                                store = %self.store,
                                transaction_id = %transaction_id,
                                timeout = ?limit,
                                "Unit of work timed out"
                            );
                            Err(E::from(DbError::timeout(
                                format!("transaction {}", transaction_id),
                                limit,
                            )))
                        }
                    },
                }
            }
            None => unit_of_work(&mut session).await,
        };

        match outcome {
            Ok(value) => match session.state() {
                TransactionState::Active => {
                    session.commit().await.map_err(E::from)?;
                    Ok(value)
                }
                TransactionState::Committed => Ok(value),
                TransactionState::RolledBack => Err(E::from(DbError::transaction(
                    "rolled back by unit of work",
                    transaction_id,
                ))),
                _ => Err(E::from(DbError::transaction(
                    "commit failed",
                    transaction_id,
                ))),
            },
            Err(err) => {
                session.rollback().await;
                Err(err)
            }
        }
    }
}

/// Generate a unique transaction ID.
fn generate_transaction_id() -> String {
    format!("tx_{}", uuid::Uuid::new_v4().simple())
}
