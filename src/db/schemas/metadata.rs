//! Bookkeeping fields shared by every clinic document

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Soft-delete flag and timestamps. Reads through `MongoCollection` skip
/// documents with `is_deleted` set.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Live metadata created and updated at `at`
    pub fn stamped(at: DateTime) -> Self {
        Self {
            is_deleted: false,
            deleted_at: None,
            updated_at: Some(at),
            created_at: Some(at),
        }
    }

    pub fn new() -> Self {
        Self::stamped(DateTime::now())
    }
}
