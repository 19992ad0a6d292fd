//! Data access for the books collection.

mod memory;
mod mongo;

pub use memory::MemoryBookStore;
pub use mongo::MongoBookStore;

use std::sync::Arc;

use async_trait::async_trait;
use bookshelf_db::bson::oid::ObjectId;
use bookshelf_db::{Database, StoreError};
use bookshelf_kernel::settings::{DatabaseSettings, StoreBackend};

use super::models::{Book, BookChanges, CreateBook, DeleteOutcome, InsertOutcome, UpdateOutcome};

/// Name of the collection holding books.
pub const COLLECTION: &str = "books";

/// Operations the books handlers need from a document store.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Every book, in the store's natural order.
    async fn list(&self) -> Result<Vec<Book>, StoreError>;

    /// The book with `id`, or [`StoreError::NotFound`].
    async fn get(&self, id: ObjectId) -> Result<Book, StoreError>;

    async fn insert(&self, book: CreateBook) -> Result<InsertOutcome, StoreError>;

    /// Set the fields in `changes` on the book with `id`.
    async fn update(&self, id: ObjectId, changes: BookChanges)
        -> Result<UpdateOutcome, StoreError>;

    async fn delete(&self, id: ObjectId) -> Result<DeleteOutcome, StoreError>;

    /// Release connections held by the store.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Verify the backing store is reachable.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Build the store selected by `settings.backend`.
pub async fn from_settings(settings: &DatabaseSettings) -> anyhow::Result<Arc<dyn BookStore>> {
    match settings.backend {
        StoreBackend::Mongodb => {
            let database = Database::connect(settings).await?;
            Ok(Arc::new(MongoBookStore::new(database)))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory book store; data is lost on restart");
            Ok(Arc::new(MemoryBookStore::new()))
        }
    }
}
