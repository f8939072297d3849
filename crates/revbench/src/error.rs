//! Harness error types

use revbench_client::ClientError;
use thiserror::Error;

/// Errors that stop a benchmark run before or after it executes.
///
/// Failed operations during a run are never errors here; they are tallied
/// in the report.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Report encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, BenchError>;
