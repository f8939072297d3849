//! Response variants

use crate::types::KeyValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeResponse {
    pub revision: i64,
    /// Number of keys in the range, regardless of `limit`
    pub count: i64,
    /// True when `count` exceeds the returned entries because of `limit`
    pub more: bool,
    pub kvs: Vec<KeyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutResponse {
    pub revision: i64,
    pub prev_kv: Option<KeyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub revision: i64,
    pub deleted: i64,
    pub prev_kvs: Vec<KeyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactResponse {
    pub revision: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnResponse {
    pub revision: i64,
    pub succeeded: bool,
    /// Responses of the executed branch, in request order
    pub responses: Vec<Response>,
}

/// Result of applying one [`Request`](crate::Request)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Range(RangeResponse),
    Put(PutResponse),
    Delete(DeleteResponse),
    Compact(CompactResponse),
    Txn(TxnResponse),
}

impl Response {
    /// Store revision at the time the operation was applied
    pub fn revision(&self) -> i64 {
        match self {
            Response::Range(r) => r.revision,
            Response::Put(r) => r.revision,
            Response::Delete(r) => r.revision,
            Response::Compact(r) => r.revision,
            Response::Txn(r) => r.revision,
        }
    }

    /// Whether the operation changed stored state
    pub fn is_write(&self) -> bool {
        match self {
            Response::Range(_) | Response::Compact(_) => false,
            Response::Put(_) => true,
            Response::Delete(r) => r.deleted > 0,
            Response::Txn(r) => r.responses.iter().any(Response::is_write),
        }
    }

    pub fn as_range(&self) -> Option<&RangeResponse> {
        match self {
            Response::Range(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_put(&self) -> Option<&PutResponse> {
        match self {
            Response::Put(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_delete(&self) -> Option<&DeleteResponse> {
        match self {
            Response::Delete(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_txn(&self) -> Option<&TxnResponse> {
        match self {
            Response::Txn(r) => Some(r),
            _ => None,
        }
    }
}
