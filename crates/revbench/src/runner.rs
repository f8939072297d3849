//! Run orchestration
//!
//! Generator -> request queue -> workers -> outcome channel -> aggregator.
//! Shutdown is driven by channel closure only: the producer drops the request
//! sender after the last request, workers exit once the queue is drained and
//! drop their outcome senders, and the aggregator finishes when the outcome
//! channel closes.

use revbench_client::KvClient;
use std::sync::Arc;

use crate::config::{Workload, WorkloadConfig};
use crate::error::{BenchError, Result};
use crate::generator::OperationGenerator;
use crate::ratelimit::TokenBucket;
use crate::report::{self, Stats};
use crate::worker::{request_queue, spawn_workers};

/// Run `workload` with one worker per client and return the aggregated stats
pub async fn run(workload: Workload, config: &WorkloadConfig, clients: Vec<KvClient>) -> Result<Stats> {
    config.validate()?;
    if clients.is_empty() {
        return Err(BenchError::Config("no clients to run with".to_string()));
    }

    let generator = OperationGenerator::new(workload, config);
    let total = generator.total();
    let workers = clients.len();
    tracing::info!(
        workload = %workload,
        total,
        workers,
        rate_limit = config.rate_limit,
        "starting benchmark"
    );

    let limiter = Arc::new(TokenBucket::per_second(config.rate_limit));
    let (request_tx, requests) = request_queue(workers);
    let (outcome_tx, aggregator) = report::channel(workers);

    let aggregation = tokio::spawn(aggregator.run());
    let mut pool = spawn_workers(clients, requests, limiter, outcome_tx);

    for request in generator {
        if request_tx.send(request).await.is_err() {
            tracing::warn!("all workers stopped before the stream ended");
            break;
        }
    }
    drop(request_tx);

    let mut executed = 0;
    while let Some(result) = pool.join_next().await {
        executed += result?;
    }

    let stats = aggregation.await?;
    tracing::info!(
        executed,
        ok = stats.count,
        failed = stats.error_count(),
        "benchmark finished"
    );
    Ok(stats)
}
