//! MongoDB driver, built on the official `mongodb` crate.
//!
//! Transactions require a replica set or sharded cluster.

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::{self, ClientOptions};
use mongodb::{Client, ClientSession};
use tracing::{debug, info};

use crate::config::{StoreOptions, mask_url};
use crate::db::driver::{StoreClient, StoreDriver, StoreSession};
use crate::error::DbResult;
use crate::models::{Acknowledgment, ReadConcern, TransactionOptions, WriteConcern};

/// Namespace tag for errors raised by this driver.
pub const MONGO_NAMESPACE: &str = "STORE.mongo";

#[derive(Debug, Clone, Copy, Default)]
pub struct MongoDriver;

impl MongoDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StoreDriver for MongoDriver {
    type Client = MongoClient;

    fn namespace(&self) -> &'static str {
        MONGO_NAMESPACE
    }

    async fn connect(&self, url: &str, store_options: &StoreOptions) -> DbResult<MongoClient> {
        let mut client_options = ClientOptions::parse(url).await?;
        client_options.max_pool_size = Some(store_options.pool_size);
        client_options.connect_timeout = Some(store_options.connect_timeout());
        client_options.server_selection_timeout = Some(store_options.connect_timeout());
        client_options.max_idle_time = Some(store_options.socket_timeout());
        client_options.app_name = Some(env!("CARGO_PKG_NAME").to_string());

        debug!(
            url = %mask_url(url),
            pool_size = store_options.pool_size,
            family = ?store_options.family,
            "Parsed MongoDB client options"
        );

        let client = Client::with_options(client_options)?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!(url = %mask_url(url), "MongoDB ping succeeded");
        Ok(MongoClient { client })
    }
}

#[derive(Debug, Clone)]
pub struct MongoClient {
    client: Client,
}

impl MongoClient {
    /// The underlying driver client, for collection access outside transactions.
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl StoreClient for MongoClient {
    type Session = MongoSession;

    async fn start_session(&self, options: &TransactionOptions) -> DbResult<MongoSession> {
        let session = self
            .client
            .start_session()
            .default_transaction_options(to_driver_options(options))
            .await?;
        Ok(MongoSession { session })
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}

pub struct MongoSession {
    session: ClientSession,
}

impl std::fmt::Debug for MongoSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoSession")
            .field("in_transaction", &self.session.in_transaction())
            .finish()
    }
}

impl MongoSession {
    /// The driver session. Pass it to collection operations with `.session(...)`.
    pub fn session_mut(&mut self) -> &mut ClientSession {
        &mut self.session
    }
}

#[async_trait]
impl StoreSession for MongoSession {
    async fn start_transaction(&mut self, options: &TransactionOptions) -> DbResult<()> {
        self.session
            .start_transaction()
            .with_options(to_driver_options(options))
            .await?;
        Ok(())
    }

    async fn commit_transaction(&mut self) -> DbResult<()> {
        self.session.commit_transaction().await?;
        Ok(())
    }

    async fn abort_transaction(&mut self) -> DbResult<()> {
        self.session.abort_transaction().await?;
        Ok(())
    }
}

fn to_driver_options(options: &TransactionOptions) -> options::TransactionOptions {
    options::TransactionOptions::builder()
        .read_concern(options.read_concern.map(to_read_concern))
        .write_concern(options.write_concern.as_ref().map(to_write_concern))
        .build()
}

fn to_read_concern(level: ReadConcern) -> options::ReadConcern {
    match level {
        ReadConcern::Local => options::ReadConcern::local(),
        ReadConcern::Majority => options::ReadConcern::majority(),
        ReadConcern::Snapshot => options::ReadConcern::snapshot(),
        ReadConcern::Available => options::ReadConcern::available(),
        ReadConcern::Linearizable => options::ReadConcern::linearizable(),
    }
}

fn to_write_concern(concern: &WriteConcern) -> options::WriteConcern {
    let w = concern.w.as_ref().map(|w| match w {
        Acknowledgment::Nodes(n) => options::Acknowledgment::Nodes(*n),
        Acknowledgment::Majority => options::Acknowledgment::Majority,
    });
    options::WriteConcern::builder()
        .w(w)
        .journal(concern.journal)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_options_mapping() {
        let ours = TransactionOptions::new()
            .read_concern(ReadConcern::Snapshot)
            .write_concern(WriteConcern::majority());
        let driver = to_driver_options(&ours);
        assert!(driver.read_concern.is_some());
        assert!(matches!(
            driver.write_concern.and_then(|w| w.w),
            Some(options::Acknowledgment::Majority)
        ));
    }

    #[test]
    fn test_empty_options_leave_driver_defaults() {
        let driver = to_driver_options(&TransactionOptions::default());
        assert!(driver.read_concern.is_none());
        assert!(driver.write_concern.is_none());
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let result = MongoDriver::new()
            .connect("not-a-url", &StoreOptions::default())
            .await;
        let err = result.unwrap_err();
        assert_eq!(err.namespace(), MONGO_NAMESPACE);
    }
}
