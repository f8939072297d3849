//! Operation stream generation
//!
//! Keys are uniform draws from `0..key_space_size`, written as decimal digits
//! at the start of a `key_size` buffer of `-`. Zero has no digits, so it
//! renders as all dashes. Values are `value_size` dashes.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use revbench_kv::{Compare, PutRequest, RangeRequest, Request, TxnOp, TxnRequest};

use crate::config::{Workload, WorkloadConfig};

/// Render key number `n` into a `key_size` wide key
pub fn render_key(n: u64, key_size: usize) -> Vec<u8> {
    let mut key = vec![b'-'; key_size];
    if n == 0 {
        return key;
    }
    let digits = n.to_string();
    let len = digits.len().min(key_size);
    key[..len].copy_from_slice(&digits.as_bytes()[..len]);
    key
}

/// Lazy, bounded stream of requests for one workload.
///
/// Two generators built from the same config and seed yield the same stream.
pub struct OperationGenerator {
    workload: Workload,
    config: WorkloadConfig,
    rng: StdRng,
    value: Vec<u8>,
    total: u64,
    emitted: u64,
}

impl OperationGenerator {
    pub fn new(workload: Workload, config: &WorkloadConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            workload,
            total: config.effective_total(workload),
            value: vec![b'-'; config.value_size],
            config: config.clone(),
            rng,
            emitted: 0,
        }
    }

    pub fn workload(&self) -> Workload {
        self.workload
    }

    /// Number of requests the stream yields in total
    pub fn total(&self) -> u64 {
        self.total
    }

    fn key(&mut self) -> Vec<u8> {
        let n = self.rng.gen_range(0..self.config.key_space_size);
        render_key(n, self.config.key_size)
    }

    fn is_read(&mut self) -> bool {
        self.rng.gen::<f64>() < self.config.read_ratio
    }

    fn put(&mut self) -> PutRequest {
        let key = self.key();
        PutRequest::new(key, self.value.clone())
    }

    fn range(&mut self) -> RangeRequest {
        RangeRequest::key(self.key())
    }

    /// Wrap `ops` into a transaction, guarding a lone op with "key absent"
    fn txn(ops: Vec<TxnOp>) -> Request {
        let guard = match ops.as_slice() {
            [TxnOp::Put(put)] => Some(put.key.clone()),
            [TxnOp::Range(range)] => Some(range.key.clone()),
            _ => None,
        };
        let mut txn = TxnRequest::new().and_then(ops);
        if let Some(key) = guard {
            txn = txn.when([Compare::mod_revision(key, 0).equal()]);
        }
        txn.into()
    }

    fn generate(&mut self) -> Request {
        let n = self.config.ops_per_txn;
        match self.workload {
            Workload::Put => self.put().into(),
            Workload::Range => self.range().into(),
            Workload::Mixed => {
                if self.is_read() {
                    self.range().into()
                } else {
                    self.put().into()
                }
            }
            Workload::Kv => {
                if self.is_read() {
                    RangeRequest::all().with_limit(self.config.range_limit).into()
                } else {
                    self.put().into()
                }
            }
            Workload::Txn => {
                let reads = (self.config.read_ratio * n as f64) as usize;
                let mut ops: Vec<TxnOp> = (0..n)
                    .map(|i| if i < reads { self.range().into() } else { self.put().into() })
                    .collect();
                ops.shuffle(&mut self.rng);
                Self::txn(ops)
            }
            Workload::TxnPut => {
                let ops = (0..n).map(|_| self.put().into()).collect();
                Self::txn(ops)
            }
            Workload::TxnRange => {
                let ops = (0..n).map(|_| self.range().into()).collect();
                Self::txn(ops)
            }
            Workload::TxnMixed => {
                let mut ops: Vec<TxnOp> = (0..n)
                    .map(|_| if self.is_read() { self.range().into() } else { self.put().into() })
                    .collect();
                ops.shuffle(&mut self.rng);
                Self::txn(ops)
            }
        }
    }
}

impl Iterator for OperationGenerator {
    type Item = Request;

    fn next(&mut self) -> Option<Request> {
        if self.emitted >= self.total {
            return None;
        }
        self.emitted += 1;
        Some(self.generate())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = usize::try_from(self.total - self.emitted).unwrap_or(usize::MAX);
        (left, Some(left))
    }
}
