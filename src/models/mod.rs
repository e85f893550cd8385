//! Data models for the document store lifecycle manager.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod model;
pub mod schema;
pub mod transaction;

// Re-export commonly used types
pub use connection::{ConnectionInfo, StoreState};
pub use model::{CompiledModel, model_name_from_stem};
pub use schema::{FieldDefinition, FieldType, SchemaBuilder, SchemaDescription, SchemaOptions};
pub use transaction::{
    Acknowledgment, ReadConcern, TransactionMetadata, TransactionOptions, TransactionState,
    WriteConcern,
};
