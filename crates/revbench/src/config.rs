//! Workload configuration

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BenchError, Result};

/// Shape of the generated operation stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Workload {
    /// Single-key puts
    Put,
    /// Single-key ranges
    Range,
    /// Ranges or puts, drawn per operation against the read ratio
    Mixed,
    /// Transactions with a fixed share of reads, shuffled
    Txn,
    /// Transactions of puts only
    TxnPut,
    /// Transactions of ranges only
    TxnRange,
    /// Transactions of ops drawn per op against the read ratio
    TxnMixed,
    /// Whole-keyspace limited ranges or single-key puts
    Kv,
}

impl Workload {
    pub const ALL: [Workload; 8] = [
        Workload::Put,
        Workload::Range,
        Workload::Mixed,
        Workload::Txn,
        Workload::TxnPut,
        Workload::TxnRange,
        Workload::TxnMixed,
        Workload::Kv,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Workload::Put => "put",
            Workload::Range => "range",
            Workload::Mixed => "mixed",
            Workload::Txn => "txn",
            Workload::TxnPut => "txn-put",
            Workload::TxnRange => "txn-range",
            Workload::TxnMixed => "txn-mixed",
            Workload::Kv => "kv",
        }
    }

    /// Whether every generated request is a transaction
    pub fn is_txn(&self) -> bool {
        matches!(
            self,
            Workload::Txn | Workload::TxnPut | Workload::TxnRange | Workload::TxnMixed
        )
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Benchmark parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Requested number of operations, before workload scaling
    pub total: u64,
    /// Operations per second; `u64::MAX` or `0` means unlimited
    pub rate_limit: u64,
    /// Length of every generated key
    pub key_size: usize,
    /// Length of every written value
    pub value_size: usize,
    /// Keys are drawn uniformly from `0..key_space_size`
    pub key_space_size: u64,
    /// Share of reads, in `[0, 1]`
    pub read_ratio: f64,
    /// Operations per transaction
    pub ops_per_txn: usize,
    /// Result limit of whole-keyspace reads
    pub range_limit: i64,
    /// Number of concurrent workers
    pub clients: usize,
    /// Number of underlying connections
    pub conns: usize,
    /// Seed for a reproducible stream; random when `None`
    pub seed: Option<u64>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            total: 10_000,
            rate_limit: u64::MAX,
            key_size: 8,
            value_size: 8,
            key_space_size: 1,
            read_ratio: 0.5,
            ops_per_txn: 1,
            range_limit: 1000,
            clients: 1,
            conns: 1,
            seed: None,
        }
    }
}

impl WorkloadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(mut self, total: u64) -> Self {
        self.total = total;
        self
    }

    pub fn rate_limit(mut self, rate_limit: u64) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn key_size(mut self, key_size: usize) -> Self {
        self.key_size = key_size;
        self
    }

    pub fn value_size(mut self, value_size: usize) -> Self {
        self.value_size = value_size;
        self
    }

    pub fn key_space_size(mut self, key_space_size: u64) -> Self {
        self.key_space_size = key_space_size;
        self
    }

    pub fn read_ratio(mut self, read_ratio: f64) -> Self {
        self.read_ratio = read_ratio;
        self
    }

    pub fn ops_per_txn(mut self, ops_per_txn: usize) -> Self {
        self.ops_per_txn = ops_per_txn;
        self
    }

    pub fn range_limit(mut self, range_limit: i64) -> Self {
        self.range_limit = range_limit;
        self
    }

    pub fn clients(mut self, clients: usize) -> Self {
        self.clients = clients;
        self
    }

    pub fn conns(mut self, conns: usize) -> Self {
        self.conns = conns;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn is_unlimited(&self) -> bool {
        self.rate_limit == 0 || self.rate_limit == u64::MAX
    }

    pub fn validate(&self) -> Result<()> {
        if self.key_space_size == 0 {
            return Err(BenchError::Config("key-space-size must be at least 1".to_string()));
        }
        if self.ops_per_txn == 0 {
            return Err(BenchError::Config("txn-ops must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.read_ratio) {
            return Err(BenchError::Config(format!(
                "read-ratio must be within [0, 1], got {}",
                self.read_ratio
            )));
        }
        if self.clients == 0 {
            return Err(BenchError::Config("clients must be at least 1".to_string()));
        }
        if self.conns == 0 {
            return Err(BenchError::Config("conns must be at least 1".to_string()));
        }

        let widest = (self.key_space_size - 1).to_string().len();
        if self.key_size < widest {
            return Err(BenchError::Config(format!(
                "key-size {} cannot hold keys of {} digits",
                self.key_size, widest
            )));
        }
        Ok(())
    }

    /// Number of requests a workload actually issues.
    ///
    /// Mixed shapes scale `total` by `1 / (1 - read_ratio)` so the number of
    /// writes stays close to `total`; transaction shapes other than `txn`
    /// divide by the ops per transaction.
    pub fn effective_total(&self, workload: Workload) -> u64 {
        let scaled = if self.read_ratio < 1.0 {
            (self.total as f64 / (1.0 - self.read_ratio)) as u64
        } else {
            self.total
        };
        let per_txn = self.ops_per_txn.max(1) as u64;

        match workload {
            Workload::Put | Workload::Range | Workload::Txn | Workload::Kv => self.total,
            Workload::Mixed => scaled,
            Workload::TxnPut | Workload::TxnRange => self.total / per_txn,
            Workload::TxnMixed => scaled / per_txn,
        }
    }
}
