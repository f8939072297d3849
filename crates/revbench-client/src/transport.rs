//! Remote-call seam and the gRPC implementation

use async_trait::async_trait;
use revbench_kv::wire;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::time::Instant;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};

use crate::ClientError;

/// Largest request the client sends
pub const MAX_SEND_BYTES: usize = 2 * 1024 * 1024;
/// Largest response the client accepts
pub const MAX_RECV_BYTES: usize = 4 * 1024 * 1024;

/// First pause while waiting for a connection to come up
const READY_BACKOFF_START: Duration = Duration::from_millis(20);
/// Longest pause between connection attempts
const READY_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// The five remote operations of the store
#[async_trait]
pub trait KvTransport: Send + Sync {
    async fn range(&self, request: wire::RangeRequest) -> Result<wire::RangeResponse, Status>;

    async fn put(&self, request: wire::PutRequest) -> Result<wire::PutResponse, Status>;

    async fn delete_range(
        &self,
        request: wire::DeleteRangeRequest,
    ) -> Result<wire::DeleteRangeResponse, Status>;

    async fn txn(&self, request: wire::TxnRequest) -> Result<wire::TxnResponse, Status>;

    async fn compact(
        &self,
        request: wire::CompactionRequest,
    ) -> Result<wire::CompactionResponse, Status>;
}

/// Policy shared by every call on a transport
#[derive(Debug, Clone)]
pub struct CallPolicy {
    /// Maximum encoded request size
    pub max_send_bytes: usize,
    /// Maximum decoded response size
    pub max_recv_bytes: usize,
    /// Hold calls until a connection is up instead of failing fast
    pub wait_for_ready: bool,
    /// Per-call deadline; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Deadline for establishing a connection when not waiting for ready
    pub connect_timeout: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            max_send_bytes: MAX_SEND_BYTES,
            max_recv_bytes: MAX_RECV_BYTES,
            wait_for_ready: true,
            timeout: None,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl CallPolicy {
    /// Set per-call timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fail calls immediately when no connection is available
    pub fn fail_fast(mut self) -> Self {
        self.wait_for_ready = false;
        self
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Turn `host:port` into a URI tonic accepts; explicit schemes are kept
pub fn endpoint_uri(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}

/// One HTTP/2 connection to a store member
#[derive(Debug, Clone)]
pub struct GrpcTransport {
    channel: Channel,
    policy: CallPolicy,
    endpoint: String,
}

impl GrpcTransport {
    /// Open a connection to `endpoint` (`host:port` or a full URI).
    ///
    /// With `wait_for_ready` the channel connects lazily and calls queue until
    /// the connection is established. Otherwise the connection is made here and
    /// a failure is returned immediately.
    pub async fn connect(endpoint: &str, policy: CallPolicy) -> Result<Self, ClientError> {
        let builder = Endpoint::from_shared(endpoint_uri(endpoint))?
            .connect_timeout(policy.connect_timeout)
            .tcp_nodelay(true);

        let channel = if policy.wait_for_ready {
            builder.connect_lazy()
        } else {
            builder.connect().await?
        };

        tracing::debug!(endpoint, wait_for_ready = policy.wait_for_ready, "transport created");
        Ok(Self {
            channel,
            policy,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn policy(&self) -> &CallPolicy {
        &self.policy
    }

    /// Send one unary call.
    ///
    /// With `wait_for_ready` the call is held while no connection can be
    /// opened, redialling with backoff until it connects or the policy
    /// timeout runs out. The request never reached a server in that case, so
    /// holding it is not a retry.
    async fn unary<Req, Resp>(&self, path: &'static str, message: Req) -> Result<Resp, Status>
    where
        Req: prost::Message + Clone + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let deadline = self.policy.timeout.map(|timeout| Instant::now() + timeout);
        let mut backoff = READY_BACKOFF_START;

        loop {
            let attempt = self.call(path, message.clone(), deadline);
            let result = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, attempt)
                    .await
                    .unwrap_or_else(|_| Err(Status::deadline_exceeded("deadline exceeded"))),
                None => attempt.await,
            };

            let status = match result {
                Err(status) if self.policy.wait_for_ready && is_connect_failure(&status) => status,
                other => return other,
            };

            let wake = Instant::now() + backoff;
            if let Some(deadline) = deadline {
                if wake >= deadline {
                    tokio::time::sleep_until(deadline).await;
                    return Err(Status::deadline_exceeded(format!(
                        "connection not ready before deadline: {}",
                        status.message()
                    )));
                }
            }
            tracing::trace!(endpoint = %self.endpoint, ?backoff, "waiting for connection");
            tokio::time::sleep_until(wake).await;
            backoff = (backoff * 2).min(READY_BACKOFF_MAX);
        }
    }

    async fn call<Req, Resp>(
        &self,
        path: &'static str,
        message: Req,
        deadline: Option<Instant>,
    ) -> Result<Resp, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone())
            .max_encoding_message_size(self.policy.max_send_bytes)
            .max_decoding_message_size(self.policy.max_recv_bytes);
        grpc.ready()
            .await
            .map_err(|e| Status::unavailable(format!("service was not ready: {}", e)))?;

        let mut request = tonic::Request::new(message);
        if let Some(deadline) = deadline {
            request.set_timeout(deadline.saturating_duration_since(Instant::now()));
        }

        let codec = ProstCodec::<Req, Resp>::default();
        let response = grpc
            .unary(request, PathAndQuery::from_static(path), codec)
            .await?;
        Ok(response.into_inner())
    }
}

/// Whether `status` means no connection could be opened, as opposed to a
/// status sent by a server that received the request
fn is_connect_failure(status: &Status) -> bool {
    if status.code() != Code::Unavailable {
        return false;
    }
    // statuses decoded from a response carry no source
    let Some(mut source) = std::error::Error::source(status) else {
        return false;
    };
    loop {
        if let Some(io) = source.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                ErrorKind::ConnectionRefused
                    | ErrorKind::NotConnected
                    | ErrorKind::AddrNotAvailable
                    | ErrorKind::TimedOut
            );
        }
        match source.source() {
            Some(next) => source = next,
            None => return status.message().contains("connect error"),
        }
    }
}

#[async_trait]
impl KvTransport for GrpcTransport {
    async fn range(&self, request: wire::RangeRequest) -> Result<wire::RangeResponse, Status> {
        self.unary(wire::method::RANGE, request).await
    }

    async fn put(&self, request: wire::PutRequest) -> Result<wire::PutResponse, Status> {
        self.unary(wire::method::PUT, request).await
    }

    async fn delete_range(
        &self,
        request: wire::DeleteRangeRequest,
    ) -> Result<wire::DeleteRangeResponse, Status> {
        self.unary(wire::method::DELETE_RANGE, request).await
    }

    async fn txn(&self, request: wire::TxnRequest) -> Result<wire::TxnResponse, Status> {
        self.unary(wire::method::TXN, request).await
    }

    async fn compact(
        &self,
        request: wire::CompactionRequest,
    ) -> Result<wire::CompactionResponse, Status> {
        self.unary(wire::method::COMPACT, request).await
    }
}
