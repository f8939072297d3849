//! Concurrent load generator for a revisioned key-value store
//!
//! # Features
//! - Eight workload shapes (put, range, mixed, txn, txn-put, txn-range, txn-mixed, kv)
//! - Token-bucket rate limiting with a burst of one
//! - Fixed-size worker pool fed by a bounded queue
//! - Streaming statistics with nearest-rank percentiles

pub mod config;
pub mod error;
pub mod generator;
pub mod ratelimit;
pub mod report;
pub mod runner;
pub mod worker;

pub use config::{Workload, WorkloadConfig};
pub use error::{BenchError, Result};
pub use generator::{render_key, OperationGenerator};
pub use ratelimit::TokenBucket;
pub use report::{Aggregator, Percentile, Stats, PERCENTILES};
pub use runner::run;
pub use worker::Outcome;
