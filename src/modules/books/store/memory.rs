use async_trait::async_trait;
use bookshelf_db::bson::oid::ObjectId;
use bookshelf_db::StoreError;
use tokio::sync::RwLock;

use super::BookStore;
use crate::modules::books::models::{
    Book, BookChanges, CreateBook, DeleteOutcome, InsertOutcome, UpdateOutcome,
};

/// Process-local store with the same semantics as the MongoDB collection.
///
/// Books are kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryBookStore {
    books: RwLock<Vec<(ObjectId, Book)>>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn list(&self) -> Result<Vec<Book>, StoreError> {
        let books = self.books.read().await;
        Ok(books.iter().map(|(_, book)| book.clone()).collect())
    }

    async fn get(&self, id: ObjectId) -> Result<Book, StoreError> {
        let books = self.books.read().await;
        books
            .iter()
            .find(|(key, _)| *key == id)
            .map(|(_, book)| book.clone())
            .ok_or_else(StoreError::not_found)
    }

    async fn insert(&self, book: CreateBook) -> Result<InsertOutcome, StoreError> {
        let id = ObjectId::new();
        let record = Book {
            id: id.to_hex(),
            title: book.title,
            author: book.author,
            year: book.year,
        };

        self.books.write().await.push((id, record));

        Ok(InsertOutcome {
            inserted_id: id.to_hex(),
        })
    }

    async fn update(
        &self,
        id: ObjectId,
        changes: BookChanges,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut books = self.books.write().await;
        let Some((_, book)) = books.iter_mut().find(|(key, _)| *key == id) else {
            return Ok(UpdateOutcome {
                matched_count: 0,
                modified_count: 0,
            });
        };

        let mut modified = false;
        for (slot, value) in [
            (&mut book.title, changes.title),
            (&mut book.author, changes.author),
            (&mut book.year, changes.year),
        ] {
            if let Some(value) = value {
                if *slot != value {
                    *slot = value;
                    modified = true;
                }
            }
        }

        Ok(UpdateOutcome {
            matched_count: 1,
            modified_count: u64::from(modified),
        })
    }

    async fn delete(&self, id: ObjectId) -> Result<DeleteOutcome, StoreError> {
        let mut books = self.books.write().await;
        let before = books.len();
        books.retain(|(key, _)| *key != id);

        Ok(DeleteOutcome {
            deleted_count: (before - books.len()) as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(title: &str, author: &str, year: &str) -> CreateBook {
        CreateBook {
            title: title.to_string(),
            author: author.to_string(),
            year: year.to_string(),
        }
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let store = MemoryBookStore::new();
        store.insert(create("A", "x", "1")).await.unwrap();
        store.insert(create("B", "y", "2")).await.unwrap();

        let titles: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = MemoryBookStore::new();
        let err = store.get(ObjectId::new()).await.unwrap_err();
        assert_eq!(err, StoreError::not_found());
    }

    #[tokio::test]
    async fn update_merges_and_counts_modifications() {
        let store = MemoryBookStore::new();
        let inserted = store.insert(create("Dune", "Herbert", "1965")).await.unwrap();
        let id = ObjectId::parse_str(&inserted.inserted_id).unwrap();

        let changes = BookChanges {
            year: Some("1999".to_string()),
            ..BookChanges::default()
        };
        let outcome = store.update(id, changes.clone()).await.unwrap();
        assert_eq!(outcome.matched_count, 1);
        assert_eq!(outcome.modified_count, 1);

        let book = store.get(id).await.unwrap();
        assert_eq!(book.title, "Dune");
        assert_eq!(book.author, "Herbert");
        assert_eq!(book.year, "1999");

        // Setting identical values matches without modifying.
        let outcome = store.update(id, changes).await.unwrap();
        assert_eq!(outcome.modified_count, 0);
    }

    #[tokio::test]
    async fn update_and_delete_of_unknown_id_succeed_with_zero_counts() {
        let store = MemoryBookStore::new();
        let id = ObjectId::new();

        let updated = store.update(id, BookChanges::default()).await.unwrap();
        assert_eq!(updated.matched_count, 0);

        let deleted = store.delete(id).await.unwrap();
        assert_eq!(deleted.deleted_count, 0);
    }
}
