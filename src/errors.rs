use thiserror::Error;

use crate::backend::Capability;

/// Error type for staged store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend fault: {0}")]
    BackendFault(String),
    #[error("backend does not support {0}")]
    UnsupportedCapability(Capability),
    #[error("store must be synchronized first: {0}")]
    SyncRequired(String),
    #[error("graph not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("schema error: {0}")]
    Schema(String),
}

impl StoreError {
    pub fn backend<T: Into<String>>(msg: T) -> Self {
        StoreError::BackendFault(msg.into())
    }

    pub fn unsupported(capability: Capability) -> Self {
        StoreError::UnsupportedCapability(capability)
    }

    pub fn sync_required<T: Into<String>>(msg: T) -> Self {
        StoreError::SyncRequired(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        StoreError::NotFound(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        StoreError::InvalidInput(msg.into())
    }

    pub fn schema<T: Into<String>>(msg: T) -> Self {
        StoreError::Schema(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::BackendFault(err.to_string())
    }
}
