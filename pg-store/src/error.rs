use hidaya_corpus::StoreError;
use hidaya_vector_store::VectorStoreError;
use tokio_postgres::error::SqlState;

/// Classify a driver error for record-store callers.
///
/// A missing extension function (no `pg_trgm`, no text search config) is
/// `Unsupported` so strategies can fall back; a dropped connection is
/// `Unavailable`.
pub(crate) fn store_error(err: tokio_postgres::Error, capability: &'static str) -> StoreError {
    if err.is_closed() {
        return StoreError::Unavailable(err.to_string());
    }
    match err.code() {
        Some(code) if missing_capability(code) => StoreError::Unsupported(capability),
        Some(code) if connection_lost(code) => StoreError::Unavailable(err.to_string()),
        Some(_) => StoreError::Query(err.to_string()),
        None => StoreError::Unavailable(err.to_string()),
    }
}

pub(crate) fn vector_error(err: tokio_postgres::Error) -> VectorStoreError {
    VectorStoreError::Storage(err.to_string())
}

fn missing_capability(code: &SqlState) -> bool {
    *code == SqlState::UNDEFINED_FUNCTION || *code == SqlState::UNDEFINED_OBJECT
}

fn connection_lost(code: &SqlState) -> bool {
    *code == SqlState::CONNECTION_EXCEPTION
        || *code == SqlState::CONNECTION_FAILURE
        || *code == SqlState::ADMIN_SHUTDOWN
        || *code == SqlState::CANNOT_CONNECT_NOW
}
