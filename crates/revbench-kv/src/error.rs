//! Protocol and store error types

use thiserror::Error;

/// Named error categories reported by the store.
///
/// The client never raises these itself; they arrive as transport statuses
/// and can be recognised with [`KvError::from_message`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvError {
    #[error("etcdserver: key is not provided")]
    EmptyKey,

    #[error("etcdserver: duplicate key given in txn request")]
    DuplicateKey,

    #[error("etcdserver: too many operations in txn request")]
    TooManyOps,

    #[error("etcdserver: key not found")]
    KeyNotFound,

    #[error("etcdserver: mvcc: required revision has been compacted")]
    Compacted,

    #[error("etcdserver: mvcc: required revision is a future revision")]
    FutureRevision,
}

impl KvError {
    const ALL: [KvError; 6] = [
        KvError::EmptyKey,
        KvError::DuplicateKey,
        KvError::TooManyOps,
        KvError::KeyNotFound,
        KvError::Compacted,
        KvError::FutureRevision,
    ];

    /// Map a store error message back to its category
    pub fn from_message(message: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| message.trim() == kind.to_string())
    }

    /// Consistency errors concern the requested revision, not the request shape
    pub fn is_consistency(&self) -> bool {
        matches!(self, KvError::Compacted | KvError::FutureRevision)
    }

    /// Validation errors concern a malformed request
    pub fn is_validation(&self) -> bool {
        !self.is_consistency()
    }
}

/// Errors converting wire messages into the protocol model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("response op carries no response")]
    EmptyResponseOp,

    #[error("request op carries no request")]
    EmptyRequestOp,

    #[error("compare on key {key:?} has no target value")]
    MissingCompareTarget { key: Vec<u8> },

    #[error("compare target {target} does not match its value on key {key:?}")]
    MismatchedCompareTarget { key: Vec<u8>, target: i32 },

    #[error("unsupported compare target: {0}")]
    UnsupportedCompareTarget(i32),

    #[error("invalid compare result: {0}")]
    InvalidCompareResult(i32),
}
