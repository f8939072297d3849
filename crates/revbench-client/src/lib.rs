//! gRPC client for a revisioned key-value store
//!
//! Dispatches protocol-model requests over a [`KvTransport`] and opens the
//! connection fan-out used by the benchmark harness.

mod client;
mod pool;
mod transport;

pub use client::{ClientError, KvClient};
pub use pool::{round_robin, ClientSet, FanoutConfig};
pub use transport::{
    endpoint_uri, CallPolicy, GrpcTransport, KvTransport, MAX_RECV_BYTES, MAX_SEND_BYTES,
};

// Re-export protocol types for convenience
pub use revbench_kv::{KvError, ProtocolError, Request, Response};
