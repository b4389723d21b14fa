//! MongoDB persistence

pub mod mongo;
pub mod schemas;
mod store;

pub use mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata, WriteOutcome};
pub use store::MongoStore;
