//! Document Store Lifecycle Library
//!
//! This library manages the lifecycle of a document-database connection: it
//! discovers and registers data models, merges layered connection configuration,
//! connects on demand, and runs units of work inside commit-once/rollback-once
//! transactions.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod store;

pub use config::{Cli, ConfigSlots, StoreConfig, StoreConfigInput};
pub use error::{DbError, DbResult};
pub use store::{ModelPathOutcome, SessionOf, Store};
