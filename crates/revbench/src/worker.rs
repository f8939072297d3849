//! Worker pool
//!
//! Workers share one request receiver and one outcome sender. Each loops:
//! take a request, wait for a rate-limit token, time `execute`, report. A
//! worker stops when the request queue is closed and drained.

use revbench_client::KvClient;
use revbench_kv::Request;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::ratelimit::TokenBucket;

/// Result of one executed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Wall-clock time around `execute`
    pub latency: Duration,
    /// Error message when the request failed
    pub error: Option<String>,
}

/// Receiving end of the request queue, shared by all workers
pub type SharedRequests = Arc<Mutex<mpsc::Receiver<Request>>>;

/// Bounded request queue with room for `capacity` queued requests
pub fn request_queue(capacity: usize) -> (mpsc::Sender<Request>, SharedRequests) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (tx, Arc::new(Mutex::new(rx)))
}

/// Execute requests from `requests` until the queue is closed.
///
/// Returns the number of requests this worker executed.
pub async fn run_worker(
    id: usize,
    client: KvClient,
    requests: SharedRequests,
    limiter: Arc<TokenBucket>,
    outcomes: mpsc::Sender<Outcome>,
) -> u64 {
    let mut executed = 0;
    loop {
        // the lock is held only while waiting for the next request
        let request = { requests.lock().await.recv().await };
        let Some(request) = request else {
            break;
        };

        limiter.wait().await;

        let start = Instant::now();
        let result = client.execute(&request).await;
        let latency = start.elapsed();
        executed += 1;

        let error = match result {
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(worker = id, op = request.name(), error = %e, "request failed");
                Some(e.to_string())
            }
        };

        if outcomes.send(Outcome { latency, error }).await.is_err() {
            tracing::warn!(worker = id, "outcome channel closed, stopping");
            break;
        }
    }

    tracing::debug!(worker = id, executed, "worker finished");
    executed
}

/// Spawn one worker per client
pub fn spawn_workers(
    clients: Vec<KvClient>,
    requests: SharedRequests,
    limiter: Arc<TokenBucket>,
    outcomes: mpsc::Sender<Outcome>,
) -> JoinSet<u64> {
    let mut workers = JoinSet::new();
    for (id, client) in clients.into_iter().enumerate() {
        workers.spawn(run_worker(
            id,
            client,
            Arc::clone(&requests),
            Arc::clone(&limiter),
            outcomes.clone(),
        ));
    }
    workers
}
