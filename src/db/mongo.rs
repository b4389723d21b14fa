//! MongoDB client and collection wrapper

use bson::{doc, DateTime, Document};
use futures_util::TryStreamExt;
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::types::ClinicError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Outcome of a write that may hit a unique index
#[derive(Debug)]
pub enum WriteOutcome<T> {
    Done(T),
    DuplicateKey,
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    let error_str = err.to_string();
    error_str.contains("duplicate key") || error_str.contains("E11000")
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, ClinicError> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| ClinicError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ClinicError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection, creating its indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, ClinicError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing and soft deletes
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, ClinicError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<(), ClinicError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| ClinicError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document as live, stamping its metadata
    pub async fn insert_one(&self, mut item: T) -> Result<WriteOutcome<()>, ClinicError> {
        *item.mut_metadata() = Metadata::stamped(DateTime::now());

        match self.inner.insert_one(item).await {
            Ok(_) => Ok(WriteOutcome::Done(())),
            Err(e) if is_duplicate_key(&e) => Ok(WriteOutcome::DuplicateKey),
            Err(e) => Err(ClinicError::Database(format!("Insert failed: {}", e))),
        }
    }

    /// Find one live document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, ClinicError> {
        self.inner
            .find_one(live(filter))
            .await
            .map_err(|e| ClinicError::Database(format!("Find failed: {}", e)))
    }

    /// Find many live documents by filter. A document that fails to decode
    /// fails the whole read.
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, ClinicError> {
        self.inner
            .find(live(filter))
            .await
            .map_err(|e| ClinicError::Database(format!("Find failed: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| {
                error!("Error reading documents: {}", e);
                ClinicError::Database(format!("Cursor failed: {}", e))
            })
    }

    /// Update one live document, stamping `metadata.updated_at`
    pub async fn update_one(
        &self,
        filter: Document,
        set: Document,
    ) -> Result<WriteOutcome<UpdateResult>, ClinicError> {
        let mut set = set;
        set.insert("metadata.updated_at", DateTime::now());
        let modifications = UpdateModifications::Document(doc! { "$set": set });

        match self.inner.update_one(live(filter), modifications).await {
            Ok(result) => Ok(WriteOutcome::Done(result)),
            Err(e) if is_duplicate_key(&e) => Ok(WriteOutcome::DuplicateKey),
            Err(e) => Err(ClinicError::Database(format!("Update failed: {}", e))),
        }
    }

    /// Soft delete one live document
    pub async fn soft_delete(&self, filter: Document) -> Result<UpdateResult, ClinicError> {
        let now = DateTime::now();
        let update = doc! {
            "$set": { "metadata.is_deleted": true, "metadata.deleted_at": now, "metadata.updated_at": now }
        };

        self.inner
            .update_one(live(filter), update)
            .await
            .map_err(|e| ClinicError::Database(format!("Soft delete failed: {}", e)))
    }
}

/// Restrict a filter to documents that are not soft-deleted
fn live(mut filter: Document) -> Document {
    filter.insert("metadata.is_deleted", doc! { "$ne": true });
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_filter_excludes_deleted() {
        let filter = live(doc! { "email": "a@x.com" });
        assert_eq!(filter.get_str("email").unwrap(), "a@x.com");
        assert_eq!(
            filter.get_document("metadata.is_deleted").unwrap(),
            &doc! { "$ne": true }
        );
    }

    // Collection behaviour needs a running MongoDB instance
}
