use async_trait::async_trait;
use bookshelf_db::bson::{doc, oid::ObjectId, Bson, Document};
use bookshelf_db::{Collection, Database, StoreError};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use super::{BookStore, COLLECTION};
use crate::modules::books::models::{
    Book, BookChanges, CreateBook, DeleteOutcome, InsertOutcome, UpdateOutcome,
};

/// Stored shape of a book. Missing string fields decode as empty.
#[derive(Debug, Serialize, Deserialize)]
struct BookDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    year: String,
}

impl BookDocument {
    fn into_book(self) -> Book {
        Book {
            id: self.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: self.title,
            author: self.author,
            year: self.year,
        }
    }
}

fn by_id(id: ObjectId) -> Document {
    doc! { "_id": id }
}

fn set_document(changes: &BookChanges) -> Document {
    changes
        .fields()
        .map(|(field, value)| (field.to_string(), Bson::String(value.to_string())))
        .collect()
}

/// Books stored in the `books` collection of a MongoDB database.
pub struct MongoBookStore {
    database: Database,
    collection: Collection<BookDocument>,
}

impl MongoBookStore {
    pub fn new(database: Database) -> Self {
        let collection = database.collection(COLLECTION);
        Self {
            database,
            collection,
        }
    }
}

#[async_trait]
impl BookStore for MongoBookStore {
    async fn list(&self) -> Result<Vec<Book>, StoreError> {
        let cursor = self.collection.find(doc! {}).await?;
        let documents: Vec<BookDocument> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(BookDocument::into_book).collect())
    }

    async fn get(&self, id: ObjectId) -> Result<Book, StoreError> {
        self.collection
            .find_one(by_id(id))
            .await?
            .map(BookDocument::into_book)
            .ok_or_else(StoreError::not_found)
    }

    async fn insert(&self, book: CreateBook) -> Result<InsertOutcome, StoreError> {
        let document = BookDocument {
            id: None,
            title: book.title,
            author: book.author,
            year: book.year,
        };

        let result = self.collection.insert_one(document).await?;
        let inserted_id = result
            .inserted_id
            .as_object_id()
            .map(|id| id.to_hex())
            .ok_or_else(|| {
                StoreError::Internal(format!(
                    "store assigned a non-ObjectId identifier: {}",
                    result.inserted_id
                ))
            })?;

        tracing::debug!(%inserted_id, "book inserted");
        Ok(InsertOutcome { inserted_id })
    }

    async fn update(
        &self,
        id: ObjectId,
        changes: BookChanges,
    ) -> Result<UpdateOutcome, StoreError> {
        // An empty `$set` is rejected by older servers; report the match only.
        if changes.is_empty() {
            let matched_count = self.collection.count_documents(by_id(id)).await?;
            return Ok(UpdateOutcome {
                matched_count,
                modified_count: 0,
            });
        }

        let update = doc! { "$set": set_document(&changes) };
        let result = self.collection.update_one(by_id(id), update).await?;

        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    async fn delete(&self, id: ObjectId) -> Result<DeleteOutcome, StoreError> {
        let result = self.collection.delete_one(by_id(id)).await?;
        Ok(DeleteOutcome {
            deleted_count: result.deleted_count,
        })
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.database.close().await;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.database.ping().await
    }
}
