//! Store driver abstraction.
//!
//! The document store client is an external collaborator. These traits are the
//! only primitives the lifecycle manager needs from it: connect, start a session,
//! and start/commit/abort a transaction on that session.

use async_trait::async_trait;

use crate::config::StoreOptions;
use crate::error::DbResult;
use crate::models::TransactionOptions;

/// Entry point of a driver: establishes connections.
#[async_trait]
pub trait StoreDriver: Send + Sync + 'static {
    type Client: StoreClient;

    /// Namespace tag carried by errors this driver produces, e.g. `STORE.mongo`.
    fn namespace(&self) -> &'static str;

    /// Connect to the server behind `url`.
    async fn connect(&self, url: &str, options: &StoreOptions) -> DbResult<Self::Client>;
}

/// An established connection.
#[async_trait]
pub trait StoreClient: Send + Sync + 'static {
    type Session: StoreSession;

    /// Start a new session. Session options mirror the transaction's concerns.
    async fn start_session(&self, options: &TransactionOptions) -> DbResult<Self::Session>;

    /// Release the connection.
    async fn close(&self) {}
}

/// A session capable of one transaction at a time.
#[async_trait]
pub trait StoreSession: Send + Sync + 'static {
    async fn start_transaction(&mut self, options: &TransactionOptions) -> DbResult<()>;

    async fn commit_transaction(&mut self) -> DbResult<()>;

    async fn abort_transaction(&mut self) -> DbResult<()>;
}
