//! MongoDB client factory and the error taxonomy shared by every store.

use anyhow::Context;
use bookshelf_kernel::settings::DatabaseSettings;
use mongodb::bson::doc;
use mongodb::error::ErrorKind;
use mongodb::Client;
use thiserror::Error;

pub use mongodb::{bson, Collection};

/// Message reported when a single-record lookup matches nothing.
pub const NO_DOCUMENTS: &str = "no documents in result";

/// Failure surfaced by a data-access operation, classified by cause.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The store rejected the request as malformed.
    #[error("{0}")]
    InvalidInput(String),

    /// The store could not be reached.
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl StoreError {
    pub fn not_found() -> Self {
        Self::NotFound(NO_DOCUMENTS.to_string())
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        let message = err.to_string();
        match err.kind.as_ref() {
            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io { .. }
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::ConnectionPoolCleared { .. } => StoreError::Unavailable(message),
            ErrorKind::InvalidArgument { .. } => StoreError::InvalidInput(message),
            _ => StoreError::Internal(message),
        }
    }
}

/// Handle to the configured MongoDB database.
///
/// Cloning is cheap; the driver pools connections internally and the handle
/// is safe to share across requests.
#[derive(Clone, Debug)]
pub struct Database {
    client: Client,
    name: String,
}

impl Database {
    /// Create a client for `settings.uri`.
    ///
    /// The driver connects lazily, so this succeeds even when the server is
    /// down; call [`Database::ping`] to verify reachability.
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        tracing::info!(target: "bookshelf-db", database = %settings.name, "connecting to MongoDB");

        let client = Client::with_uri_str(&settings.uri)
            .await
            .with_context(|| "failed to create MongoDB client")?;

        Ok(Self {
            client,
            name: settings.name.clone(),
        })
    }

    /// Typed accessor for a named collection.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.client.database(&self.name).collection(name)
    }

    /// Round-trip a `ping` command to the server.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database(&self.name)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    /// Close pooled connections and wait for in-flight operations.
    pub async fn close(&self) {
        tracing::info!(target: "bookshelf-db", database = %self.name, "closing MongoDB client");
        self.client.clone().shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::error::Error;

    fn settings(uri: &str) -> DatabaseSettings {
        DatabaseSettings {
            uri: uri.to_string(),
            ..DatabaseSettings::default()
        }
    }

    #[tokio::test]
    async fn server_selection_is_unavailable() {
        let db = Database::connect(&settings(
            "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=50",
        ))
        .await
        .unwrap();

        let err = db.ping().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)), "got {err:?}");
    }

    #[test]
    fn io_failure_is_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::from(io);
        assert!(matches!(StoreError::from(err), StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn invalid_argument_is_invalid_input() {
        let err = Client::with_uri_str("mongodb://h/?bogusOption=x")
            .await
            .unwrap_err();
        assert!(matches!(*err.kind, ErrorKind::InvalidArgument { .. }));

        let classified = StoreError::from(err);
        assert!(matches!(classified, StoreError::InvalidInput(_)));
        assert!(classified.to_string().contains("bogus"));
    }

    #[test]
    fn other_failures_are_internal() {
        let err = Error::custom("unexpected reply");
        assert!(matches!(StoreError::from(err), StoreError::Internal(_)));
    }

    #[test]
    fn not_found_uses_driver_wording() {
        assert_eq!(StoreError::not_found().to_string(), NO_DOCUMENTS);
    }
}
