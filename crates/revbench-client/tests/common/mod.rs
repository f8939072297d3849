//! In-process store double speaking the wire messages
//!
//! Keeps the full per-key history so reads at an explicit revision work, and
//! reports store errors the way a real server does: as a status whose
//! message is the error text.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use revbench_client::{KvClient, KvTransport};
use revbench_kv::{
    range_contains, wire, CompactRequest, CompactResponse, DeleteRequest, DeleteResponse,
    KeyValue, KvError, PutRequest, PutResponse, RangeRequest, RangeResponse, Response,
    SortOrder, SortTarget, TxnOp, TxnRequest, TxnResponse,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tonic::Status;

/// Transactions with more operations than this are rejected
pub const MAX_TXN_OPS: usize = 128;

#[derive(Debug, Default)]
struct State {
    revision: i64,
    compacted: i64,
    /// Per key: (revision, entry) in write order; `None` is a tombstone
    history: BTreeMap<Vec<u8>, Vec<(i64, Option<KeyValue>)>>,
}

impl State {
    fn get(&self, key: &[u8], at: i64) -> Option<&KeyValue> {
        self.history
            .get(key)?
            .iter()
            .rev()
            .find(|(rev, _)| *rev <= at)
            .and_then(|(_, kv)| kv.as_ref())
    }

    fn live(&self, key: &[u8], range_end: &[u8], at: i64) -> Vec<KeyValue> {
        self.history
            .keys()
            .filter(|candidate| range_contains(key, range_end, candidate))
            .filter_map(|candidate| self.get(candidate, at).cloned())
            .collect()
    }

    fn check_read_revision(&self, revision: i64) -> Result<(), KvError> {
        if revision > self.revision {
            return Err(KvError::FutureRevision);
        }
        if revision > 0 && revision < self.compacted {
            return Err(KvError::Compacted);
        }
        Ok(())
    }

    fn range(&self, req: &RangeRequest, at: i64) -> Result<RangeResponse, KvError> {
        if req.key.is_empty() {
            return Err(KvError::EmptyKey);
        }
        let read_at = if req.revision > 0 {
            self.check_read_revision(req.revision)?;
            req.revision
        } else {
            at
        };

        let mut kvs: Vec<KeyValue> = self
            .live(&req.key, &req.range_end, read_at)
            .into_iter()
            .filter(|kv| within(kv.mod_revision, req.min_mod_revision, req.max_mod_revision))
            .filter(|kv| within(kv.create_revision, req.min_create_revision, req.max_create_revision))
            .collect();

        let order = match (req.sort_order, req.sort_target) {
            (SortOrder::None, SortTarget::Key) => SortOrder::None,
            (SortOrder::None, _) => SortOrder::Ascend,
            (order, _) => order,
        };
        if order != SortOrder::None {
            kvs.sort_by(|a, b| match req.sort_target {
                SortTarget::Key => a.key.cmp(&b.key),
                SortTarget::Version => a.version.cmp(&b.version),
                SortTarget::CreateRevision => a.create_revision.cmp(&b.create_revision),
                SortTarget::ModRevision => a.mod_revision.cmp(&b.mod_revision),
                SortTarget::Value => a.value.cmp(&b.value),
            });
            if order == SortOrder::Descend {
                kvs.reverse();
            }
        }

        let count = kvs.len() as i64;
        let mut more = false;
        if req.limit > 0 && kvs.len() > req.limit as usize {
            kvs.truncate(req.limit as usize);
            more = true;
        }
        if req.count_only {
            kvs.clear();
        } else if req.keys_only {
            kvs.iter_mut().for_each(|kv| kv.value.clear());
        }

        Ok(RangeResponse {
            revision: 0,
            count,
            more,
            kvs,
        })
    }

    fn put(&mut self, req: &PutRequest, rev: i64) -> Result<PutResponse, KvError> {
        if req.key.is_empty() {
            return Err(KvError::EmptyKey);
        }
        let prev = self.get(&req.key, rev).cloned();
        if req.ignore_value && prev.is_none() {
            return Err(KvError::KeyNotFound);
        }

        let value = match (&prev, req.ignore_value) {
            (Some(prev), true) => prev.value.clone(),
            _ => req.value.clone(),
        };
        let kv = KeyValue {
            key: req.key.clone(),
            value,
            create_revision: prev.as_ref().map_or(rev, |p| p.create_revision),
            mod_revision: rev,
            version: prev.as_ref().map_or(1, |p| p.version + 1),
        };
        self.history.entry(req.key.clone()).or_default().push((rev, Some(kv)));

        Ok(PutResponse {
            revision: 0,
            prev_kv: if req.prev_kv { prev } else { None },
        })
    }

    fn delete(&mut self, req: &DeleteRequest, rev: i64) -> Result<DeleteResponse, KvError> {
        if req.key.is_empty() {
            return Err(KvError::EmptyKey);
        }
        let removed = self.live(&req.key, &req.range_end, rev);
        for kv in &removed {
            if let Some(history) = self.history.get_mut(&kv.key) {
                history.push((rev, None));
            }
        }

        Ok(DeleteResponse {
            revision: 0,
            deleted: removed.len() as i64,
            prev_kvs: if req.prev_kv { removed } else { Vec::new() },
        })
    }

    fn txn(&mut self, req: &TxnRequest, rev: i64) -> Result<TxnResponse, KvError> {
        let succeeded = req
            .compare
            .iter()
            .all(|cmp| cmp.evaluate(self.get(&cmp.key, rev)));
        let branch = if succeeded { &req.success } else { &req.failure };

        let mut responses = Vec::with_capacity(branch.len());
        for op in branch {
            responses.push(match op {
                TxnOp::Range(r) => Response::Range(self.range(r, rev)?),
                TxnOp::Put(r) => Response::Put(self.put(r, rev)?),
                TxnOp::Delete(r) => Response::Delete(self.delete(r, rev)?),
                TxnOp::Txn(r) => Response::Txn(self.txn(r, rev)?),
            });
        }

        Ok(TxnResponse {
            revision: 0,
            succeeded,
            responses,
        })
    }

    /// Reject what the store refuses before anything is applied
    fn validate_txn(req: &TxnRequest) -> Result<(), KvError> {
        fn count(ops: &[TxnOp]) -> usize {
            ops.iter()
                .map(|op| match op {
                    TxnOp::Txn(t) => 1 + count(&t.success).max(count(&t.failure)),
                    _ => 1,
                })
                .sum()
        }
        fn empty_key(ops: &[TxnOp]) -> bool {
            ops.iter().any(|op| match op {
                TxnOp::Range(r) => r.key.is_empty(),
                TxnOp::Put(r) => r.key.is_empty(),
                TxnOp::Delete(r) => r.key.is_empty(),
                TxnOp::Txn(t) => empty_key(&t.success) || empty_key(&t.failure),
            })
        }

        if req.compare.len().max(count(&req.success)).max(count(&req.failure)) > MAX_TXN_OPS {
            return Err(KvError::TooManyOps);
        }
        if empty_key(&req.success) || empty_key(&req.failure) {
            return Err(KvError::EmptyKey);
        }
        if req.conflicting_key().is_some() {
            return Err(KvError::DuplicateKey);
        }
        Ok(())
    }

    /// Run `apply` at the next revision, keeping it only if something was written
    fn commit<T>(
        &mut self,
        apply: impl FnOnce(&mut Self, i64) -> Result<T, KvError>,
    ) -> Result<(T, i64), KvError> {
        let next = self.revision + 1;
        let snapshot = self.history.clone();
        match apply(self, next) {
            Ok(out) => {
                let wrote = self
                    .history
                    .values()
                    .any(|h| h.last().is_some_and(|(rev, _)| *rev == next));
                if wrote {
                    self.revision = next;
                }
                Ok((out, self.revision))
            }
            Err(e) => {
                self.history = snapshot;
                Err(e)
            }
        }
    }

    fn compact(&mut self, req: &CompactRequest) -> Result<CompactResponse, KvError> {
        if req.revision > self.revision {
            return Err(KvError::FutureRevision);
        }
        if req.revision <= self.compacted {
            return Err(KvError::Compacted);
        }
        self.compacted = req.revision;

        // keep the newest entry at or below the compaction point
        let compacted = self.compacted;
        for history in self.history.values_mut() {
            let keep_from = history
                .iter()
                .rposition(|(rev, _)| *rev <= compacted)
                .unwrap_or(0);
            history.drain(..keep_from);
        }
        self.history
            .retain(|_, h| !(h.len() == 1 && h[0].1.is_none() && h[0].0 <= compacted));

        Ok(CompactResponse {
            revision: self.revision,
        })
    }
}

fn within(value: i64, min: i64, max: i64) -> bool {
    (min == 0 || value >= min) && (max == 0 || value <= max)
}

fn stamp(response: &mut Response, revision: i64) {
    match response {
        Response::Range(r) => r.revision = revision,
        Response::Put(r) => r.revision = revision,
        Response::Delete(r) => r.revision = revision,
        Response::Compact(r) => r.revision = revision,
        Response::Txn(r) => {
            r.revision = revision;
            r.responses.iter_mut().for_each(|nested| stamp(nested, revision));
        }
    }
}

fn status(err: KvError) -> Status {
    match err {
        KvError::Compacted | KvError::FutureRevision => Status::out_of_range(err.to_string()),
        _ => Status::invalid_argument(err.to_string()),
    }
}

/// Revisioned in-memory store
#[derive(Debug, Default)]
pub struct MemStore {
    state: Mutex<State>,
}

impl MemStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn revision(&self) -> i64 {
        self.state.lock().revision
    }

    /// Client with this store as its transport
    pub fn client(self: &Arc<Self>) -> KvClient {
        KvClient::new(self.clone())
    }

    fn run(
        &self,
        apply: impl FnOnce(&mut State, i64) -> Result<Response, KvError>,
    ) -> Result<Response, Status> {
        let mut state = self.state.lock();
        let (mut response, revision) = state.commit(apply).map_err(status)?;
        stamp(&mut response, revision);
        Ok(response)
    }
}

#[async_trait]
impl KvTransport for MemStore {
    async fn range(&self, request: wire::RangeRequest) -> Result<wire::RangeResponse, Status> {
        let request = RangeRequest::from(request);
        let response = self.run(|s, rev| s.range(&request, rev).map(Response::Range))?;
        match response {
            Response::Range(r) => Ok((&r).into()),
            _ => Err(Status::internal("unexpected response")),
        }
    }

    async fn put(&self, request: wire::PutRequest) -> Result<wire::PutResponse, Status> {
        let request = PutRequest::from(request);
        let response = self.run(|s, rev| s.put(&request, rev).map(Response::Put))?;
        match response {
            Response::Put(r) => Ok((&r).into()),
            _ => Err(Status::internal("unexpected response")),
        }
    }

    async fn delete_range(
        &self,
        request: wire::DeleteRangeRequest,
    ) -> Result<wire::DeleteRangeResponse, Status> {
        let request = DeleteRequest::from(request);
        let response = self.run(|s, rev| s.delete(&request, rev).map(Response::Delete))?;
        match response {
            Response::Delete(r) => Ok((&r).into()),
            _ => Err(Status::internal("unexpected response")),
        }
    }

    async fn txn(&self, request: wire::TxnRequest) -> Result<wire::TxnResponse, Status> {
        let request = TxnRequest::try_from(request)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;
        State::validate_txn(&request).map_err(status)?;
        let response = self.run(|s, rev| s.txn(&request, rev).map(Response::Txn))?;
        match response {
            Response::Txn(r) => Ok((&r).into()),
            _ => Err(Status::internal("unexpected response")),
        }
    }

    async fn compact(
        &self,
        request: wire::CompactionRequest,
    ) -> Result<wire::CompactionResponse, Status> {
        let request = CompactRequest::from(request);
        let mut state = self.state.lock();
        let response = state.compact(&request).map_err(status)?;
        Ok((&response).into())
    }
}
