//! HTTP handlers for `/books`.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookshelf_db::bson::oid::ObjectId;
use bookshelf_http::error::AppError;
use serde::Serialize;

use super::models::{Book, CreateBook, DeleteOutcome, InsertOutcome, UpdateBook, UpdateOutcome};
use super::store::BookStore;

type SharedStore = Arc<dyn BookStore>;

/// Read responses: `{"data": ...}`
#[derive(Debug, Serialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Write responses: `{"result": ...}`
#[derive(Debug, Serialize)]
pub struct ResultEnvelope<T> {
    pub result: T,
}

/// Routes relative to the module mount point.
pub fn routes(store: SharedStore) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(store)
}

/// Validate a path identifier without touching the store.
pub fn parse_object_id(raw: &str) -> Result<ObjectId, AppError> {
    if raw.is_empty() {
        return Err(AppError::bad_request("id is required"));
    }
    ObjectId::parse_str(raw).map_err(|_| AppError::bad_request("invalid id"))
}

/// Resolve the `{id}` segment; an undecodable segment is an invalid id.
fn path_id(path: Result<Path<String>, PathRejection>) -> Result<ObjectId, AppError> {
    let Path(raw) = path.map_err(|rejection| {
        tracing::debug!(%rejection, "rejected path id");
        AppError::bad_request("invalid id")
    })?;
    parse_object_id(&raw)
}

fn invalid_body(rejection: JsonRejection) -> AppError {
    tracing::debug!(%rejection, "rejected request body");
    AppError::bad_request("Invalid body")
}

async fn list_books(
    State(store): State<SharedStore>,
) -> Result<Json<DataEnvelope<Vec<Book>>>, AppError> {
    let books = store.list().await?;
    Ok(Json(DataEnvelope { data: books }))
}

async fn get_book(
    State(store): State<SharedStore>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<DataEnvelope<Book>>, AppError> {
    let id = path_id(path)?;
    let book = store.get(id).await?;
    Ok(Json(DataEnvelope { data: book }))
}

async fn create_book(
    State(store): State<SharedStore>,
    body: Result<Json<CreateBook>, JsonRejection>,
) -> Result<(StatusCode, Json<ResultEnvelope<InsertOutcome>>), AppError> {
    let Json(book) = body.map_err(invalid_body)?;

    let result = store
        .insert(book)
        .await
        .map_err(|e| AppError::operation("Failed to create book", e))?;

    tracing::info!(id = %result.inserted_id, "book created");
    Ok((StatusCode::CREATED, Json(ResultEnvelope { result })))
}

async fn update_book(
    State(store): State<SharedStore>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<UpdateBook>, JsonRejection>,
) -> Result<Json<ResultEnvelope<UpdateOutcome>>, AppError> {
    let Json(changes) = body.map_err(invalid_body)?;
    let id = path_id(path)?;

    let result = store
        .update(id, changes.into_changes())
        .await
        .map_err(|e| AppError::operation("Failed to update book", e))?;

    tracing::info!(
        %id,
        matched = result.matched_count,
        modified = result.modified_count,
        "book updated"
    );
    Ok(Json(ResultEnvelope { result }))
}

async fn delete_book(
    State(store): State<SharedStore>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<ResultEnvelope<DeleteOutcome>>, AppError> {
    let id = path_id(path)?;

    let result = store
        .delete(id)
        .await
        .map_err(|e| AppError::operation("Failed to delete book", e))?;

    tracing::info!(%id, deleted = result.deleted_count, "book deleted");
    Ok(Json(ResultEnvelope { result }))
}
