//! Error types for the journal.

use crate::model::{ParkArea, ParkType};
use crate::types::{Collection, RecordId};
use thiserror::Error;

/// Main error type for journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{collection} record not found: {id}")]
    NotFound { collection: Collection, id: RecordId },

    #[error("{collection} record {id} is referenced but does not exist")]
    DanglingReference { collection: Collection, id: RecordId },

    #[error("Area {area} does not belong to the {park_type} park")]
    AreaMismatch { area: ParkArea, park_type: ParkType },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Journal is locked by another process")]
    Locked,

    #[error("Journal not initialized")]
    NotInitialized,

    #[error("Invalid journal format: {0}")]
    InvalidFormat(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl JournalError {
    /// Whether the persistence medium itself failed (I/O, locking, format or
    /// decoding), as opposed to a missing record or a rejected input.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            JournalError::Io(_)
                | JournalError::Serialization(_)
                | JournalError::Deserialization(_)
                | JournalError::Corruption(_)
                | JournalError::ChecksumMismatch { .. }
                | JournalError::Locked
                | JournalError::NotInitialized
                | JournalError::InvalidFormat(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, JournalError::NotFound { .. })
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(e: serde_json::Error) -> Self {
        JournalError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for JournalError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        JournalError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for JournalError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        JournalError::Deserialization(e.to_string())
    }
}

/// Result type for journal operations.
pub type Result<T> = std::result::Result<T, JournalError>;
