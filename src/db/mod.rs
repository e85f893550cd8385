//! Store access layer.
//!
//! This module provides the store lifecycle building blocks:
//! - Driver traits the lifecycle manager consumes
//! - Model discovery and registration
//! - Connection management
//! - Transaction coordination
//! - Driver implementations (in-memory, and MongoDB behind the `mongodb` feature)

pub mod connection;
pub mod driver;
pub mod loader;
pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;
pub mod registry;
pub mod transaction;

pub use connection::{ConnectionManager, build_connection_url};
pub use driver::{StoreClient, StoreDriver, StoreSession};
pub use loader::{
    FileSchemaProvider, LoadReport, ModelLoader, SchemaProvider, SkipReason, SkippedModel,
    compile_model,
};
pub use memory::{MemoryClient, MemoryDriver, MemorySession, MemoryStats};
#[cfg(feature = "mongodb")]
pub use mongo::{MongoClient, MongoDriver, MongoSession};
pub use registry::ModelRegistry;
pub use transaction::{ActiveTransactions, TransactionCoordinator, TransactionSession};
