//! Protocol model for a revisioned key-value store
//!
//! # Features
//! - Closed request/response sum types (range, put, delete, compact, txn)
//! - Compare predicates and nested transactions
//! - Wire messages and conversion to and from the model
//! - Key-range helpers (prefix, from-key, whole keyspace)
//! - Expected-revision tracking for sequential checks

pub mod codec;
pub mod compare;
pub mod error;
pub mod keys;
pub mod oracle;
pub mod request;
pub mod response;
pub mod types;
pub mod wire;

pub use codec::{deserialize, serialize, WireRequest, WireResponse};
pub use compare::{Compare, CompareResult, CompareTarget};
pub use error::{KvError, ProtocolError};
pub use keys::{prefix_end, range_contains, NUL_KEY};
pub use oracle::{RevisionMismatch, RevisionOracle};
pub use request::{
    CompactRequest, DeleteRequest, PutRequest, RangeRequest, Request, SortOrder, SortTarget,
    TxnOp, TxnRequest,
};
pub use response::{
    CompactResponse, DeleteResponse, PutResponse, RangeResponse, Response, TxnResponse,
};
pub use types::KeyValue;
