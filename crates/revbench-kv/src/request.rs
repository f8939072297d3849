//! Request variants

use crate::compare::Compare;
use crate::keys::{prefix_end, range_contains, NUL_KEY};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortTarget {
    #[default]
    Key,
    Version,
    CreateRevision,
    ModRevision,
    Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    None,
    Ascend,
    Descend,
}

/// Point or range read.
///
/// Zero-valued numeric fields mean "unset": `limit == 0` is unlimited,
/// `revision == 0` reads the latest revision, and zero revision bounds do not
/// filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeRequest {
    pub key: Vec<u8>,
    pub range_end: Vec<u8>,
    pub limit: i64,
    pub revision: i64,
    pub sort_target: SortTarget,
    pub sort_order: SortOrder,
    pub keys_only: bool,
    pub count_only: bool,
    pub min_mod_revision: i64,
    pub max_mod_revision: i64,
    pub min_create_revision: i64,
    pub max_create_revision: i64,
}

impl RangeRequest {
    /// Read a single key
    pub fn key(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Read every key starting with `prefix`
    pub fn prefix(prefix: impl Into<Vec<u8>>) -> Self {
        let key = prefix.into();
        let range_end = prefix_end(&key);
        Self {
            key,
            range_end,
            ..Default::default()
        }
    }

    /// Read every key `>= key`
    pub fn from_key(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            range_end: NUL_KEY.to_vec(),
            ..Default::default()
        }
    }

    /// Read the whole keyspace
    pub fn all() -> Self {
        Self::from_key(NUL_KEY)
    }

    /// Read `[key, range_end)`
    pub fn between(key: impl Into<Vec<u8>>, range_end: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            range_end: range_end.into(),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn at_revision(mut self, revision: i64) -> Self {
        self.revision = revision;
        self
    }

    pub fn keys_only(mut self) -> Self {
        self.keys_only = true;
        self
    }

    pub fn count_only(mut self) -> Self {
        self.count_only = true;
        self
    }

    pub fn mod_revision_bounds(mut self, min: i64, max: i64) -> Self {
        self.min_mod_revision = min;
        self.max_mod_revision = max;
        self
    }

    pub fn create_revision_bounds(mut self, min: i64, max: i64) -> Self {
        self.min_create_revision = min;
        self.max_create_revision = max;
        self
    }

    pub fn order_by_key(mut self) -> Self {
        self.sort_target = SortTarget::Key;
        self
    }

    pub fn order_by_mod_revision(mut self) -> Self {
        self.sort_target = SortTarget::ModRevision;
        self
    }

    pub fn order_by_create_revision(mut self) -> Self {
        self.sort_target = SortTarget::CreateRevision;
        self
    }

    pub fn order_by_version(mut self) -> Self {
        self.sort_target = SortTarget::Version;
        self
    }

    pub fn order_by_value(mut self) -> Self {
        self.sort_target = SortTarget::Value;
        self
    }

    pub fn ascending(mut self) -> Self {
        self.sort_order = SortOrder::Ascend;
        self
    }

    pub fn descending(mut self) -> Self {
        self.sort_order = SortOrder::Descend;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PutRequest {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// Return the entry as it was before this write
    pub prev_kv: bool,
    /// Keep the current value; only bump revisions
    pub ignore_value: bool,
}

impl PutRequest {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_prev_kv(mut self) -> Self {
        self.prev_kv = true;
        self
    }

    pub fn ignore_value(mut self) -> Self {
        self.ignore_value = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub key: Vec<u8>,
    pub range_end: Vec<u8>,
    /// Return the deleted entries
    pub prev_kv: bool,
}

impl DeleteRequest {
    pub fn key(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn prefix(prefix: impl Into<Vec<u8>>) -> Self {
        let key = prefix.into();
        let range_end = prefix_end(&key);
        Self {
            key,
            range_end,
            prev_kv: false,
        }
    }

    pub fn between(key: impl Into<Vec<u8>>, range_end: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            range_end: range_end.into(),
            prev_kv: false,
        }
    }

    pub fn with_prev_kv(mut self) -> Self {
        self.prev_kv = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompactRequest {
    pub revision: i64,
    /// Wait until the compaction is physically applied
    pub physical: bool,
}

impl CompactRequest {
    pub fn new(revision: i64) -> Self {
        Self {
            revision,
            physical: false,
        }
    }

    pub fn physical(mut self) -> Self {
        self.physical = true;
        self
    }
}

/// Multi-operation transaction.
///
/// All `compare` predicates must hold for `success` to run; otherwise
/// `failure` runs. Branches may nest further transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxnRequest {
    pub compare: Vec<Compare>,
    pub success: Vec<TxnOp>,
    pub failure: Vec<TxnOp>,
}

impl TxnRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when(mut self, compare: impl IntoIterator<Item = Compare>) -> Self {
        self.compare.extend(compare);
        self
    }

    pub fn and_then(mut self, success: impl IntoIterator<Item = TxnOp>) -> Self {
        self.success.extend(success);
        self
    }

    pub fn or_else(mut self, failure: impl IntoIterator<Item = TxnOp>) -> Self {
        self.failure.extend(failure);
        self
    }

    /// First key written more than once within one branch, if any.
    ///
    /// The store rejects such a transaction as a whole. A key may be put at
    /// most once per branch and may not be put inside a range the same branch
    /// deletes. The then and else branches of a nested transaction are
    /// exclusive, so a key put in both counts as one write of the parent.
    pub fn conflicting_key(&self) -> Option<&[u8]> {
        branch_writes(&self.success)
            .and_then(|_| branch_writes(&self.failure))
            .err()
    }
}

/// Puts and deleted ranges of one transaction branch
#[derive(Default)]
struct BranchWrites<'a> {
    puts: HashSet<&'a [u8]>,
    deletes: Vec<(&'a [u8], &'a [u8])>,
}

/// Writes of `ops`, or the first conflicting key
fn branch_writes(ops: &[TxnOp]) -> Result<BranchWrites<'_>, &[u8]> {
    let mut writes = BranchWrites::default();
    for op in ops {
        match op {
            TxnOp::Put(put) => {
                if !writes.puts.insert(put.key.as_slice()) {
                    return Err(put.key.as_slice());
                }
            }
            TxnOp::Delete(del) => writes
                .deletes
                .push((del.key.as_slice(), del.range_end.as_slice())),
            TxnOp::Txn(txn) => {
                let then = branch_writes(&txn.success)?;
                let otherwise = branch_writes(&txn.failure)?;
                for &key in then.puts.union(&otherwise.puts) {
                    if !writes.puts.insert(key) {
                        return Err(key);
                    }
                }
                writes.deletes.extend(then.deletes);
                writes.deletes.extend(otherwise.deletes);
            }
            TxnOp::Range(_) => {}
        }
    }

    let deleted = writes.puts.iter().copied().find(|key| {
        writes
            .deletes
            .iter()
            .any(|(start, end)| range_contains(start, end, key))
    });
    match deleted {
        Some(key) => Err(key),
        None => Ok(writes),
    }
}

/// Closed set of operations the store understands
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Request {
    Range(RangeRequest),
    Put(PutRequest),
    Delete(DeleteRequest),
    Compact(CompactRequest),
    Txn(TxnRequest),
}

impl Request {
    /// Short operation name, used for logging
    pub fn name(&self) -> &'static str {
        match self {
            Request::Range(_) => "range",
            Request::Put(_) => "put",
            Request::Delete(_) => "delete",
            Request::Compact(_) => "compact",
            Request::Txn(_) => "txn",
        }
    }

    /// Whether the request may change stored state
    pub fn is_write_request(&self) -> bool {
        match self {
            Request::Range(_) | Request::Compact(_) => false,
            Request::Put(_) | Request::Delete(_) => true,
            Request::Txn(txn) => txn.is_write_request(),
        }
    }
}

impl TxnRequest {
    /// Whether either branch may change stored state
    pub fn is_write_request(&self) -> bool {
        self.success
            .iter()
            .chain(self.failure.iter())
            .any(TxnOp::is_write_request)
    }
}

/// Operations allowed inside a transaction branch.
///
/// Compaction is not transactional, so it has no variant here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxnOp {
    Range(RangeRequest),
    Put(PutRequest),
    Delete(DeleteRequest),
    Txn(TxnRequest),
}

impl TxnOp {
    pub fn is_write_request(&self) -> bool {
        match self {
            TxnOp::Range(_) => false,
            TxnOp::Put(_) | TxnOp::Delete(_) => true,
            TxnOp::Txn(txn) => txn.is_write_request(),
        }
    }
}

impl From<RangeRequest> for TxnOp {
    fn from(request: RangeRequest) -> Self {
        TxnOp::Range(request)
    }
}

impl From<PutRequest> for TxnOp {
    fn from(request: PutRequest) -> Self {
        TxnOp::Put(request)
    }
}

impl From<DeleteRequest> for TxnOp {
    fn from(request: DeleteRequest) -> Self {
        TxnOp::Delete(request)
    }
}

impl From<TxnRequest> for TxnOp {
    fn from(request: TxnRequest) -> Self {
        TxnOp::Txn(request)
    }
}

impl From<TxnOp> for Request {
    fn from(op: TxnOp) -> Self {
        match op {
            TxnOp::Range(r) => Request::Range(r),
            TxnOp::Put(r) => Request::Put(r),
            TxnOp::Delete(r) => Request::Delete(r),
            TxnOp::Txn(r) => Request::Txn(r),
        }
    }
}

impl From<RangeRequest> for Request {
    fn from(request: RangeRequest) -> Self {
        Request::Range(request)
    }
}

impl From<PutRequest> for Request {
    fn from(request: PutRequest) -> Self {
        Request::Put(request)
    }
}

impl From<DeleteRequest> for Request {
    fn from(request: DeleteRequest) -> Self {
        Request::Delete(request)
    }
}

impl From<CompactRequest> for Request {
    fn from(request: CompactRequest) -> Self {
        Request::Compact(request)
    }
}

impl From<TxnRequest> for Request {
    fn from(request: TxnRequest) -> Self {
        Request::Txn(request)
    }
}
