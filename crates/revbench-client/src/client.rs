//! Request dispatcher

use revbench_kv::{
    deserialize, serialize, CompactRequest, CompactResponse, DeleteRequest, DeleteResponse,
    KvError, ProtocolError, PutRequest, PutResponse, RangeRequest, RangeResponse, Request,
    Response, TxnRequest, TxnResponse, WireRequest, WireResponse,
};
use std::sync::Arc;
use thiserror::Error;
use tonic::Code;

use crate::transport::KvTransport;

/// Client error types
#[derive(Error, Debug)]
pub enum ClientError {
    /// Status returned by the remote call, unmodified
    #[error("rpc error: code = {:?} desc = {}", .0.code(), .0.message())]
    Transport(#[from] tonic::Status),

    #[error("Connection error: {0}")]
    Connect(#[from] tonic::transport::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Store error category carried by a transport status
    pub fn kv_error(&self) -> Option<KvError> {
        match self {
            ClientError::Transport(status) => KvError::from_message(status.message()),
            _ => None,
        }
    }

    /// Whether a caller could reasonably retry. The client itself never does.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(status) => {
                self.kv_error().is_none()
                    && matches!(status.code(), Code::Unavailable | Code::DeadlineExceeded)
            }
            ClientError::Connect(_) => true,
            ClientError::Protocol(_) | ClientError::Config(_) => false,
        }
    }
}

/// Stateless protocol client over a shared transport.
///
/// Cloning is cheap; clones share the transport.
#[derive(Clone)]
pub struct KvClient {
    transport: Arc<dyn KvTransport>,
}

impl KvClient {
    pub fn new(transport: Arc<dyn KvTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn KvTransport> {
        &self.transport
    }

    /// Serialize `request`, invoke the matching remote operation and
    /// deserialize the result. Errors are passed through; nothing is retried.
    pub async fn execute(&self, request: &Request) -> Result<Response, ClientError> {
        let response = match serialize(request) {
            WireRequest::Range(r) => WireResponse::Range(self.transport.range(r).await?),
            WireRequest::Put(r) => WireResponse::Put(self.transport.put(r).await?),
            WireRequest::DeleteRange(r) => {
                WireResponse::DeleteRange(self.transport.delete_range(r).await?)
            }
            WireRequest::Txn(r) => WireResponse::Txn(self.transport.txn(r).await?),
            WireRequest::Compact(r) => WireResponse::Compact(self.transport.compact(r).await?),
        };

        let response = deserialize(response)?;
        tracing::trace!(
            op = request.name(),
            revision = response.revision(),
            write = response.is_write(),
            "request executed"
        );
        Ok(response)
    }

    pub async fn range(&self, request: &RangeRequest) -> Result<RangeResponse, ClientError> {
        Ok(self.transport.range(request.into()).await?.into())
    }

    pub async fn put(&self, request: &PutRequest) -> Result<PutResponse, ClientError> {
        Ok(self.transport.put(request.into()).await?.into())
    }

    pub async fn delete(&self, request: &DeleteRequest) -> Result<DeleteResponse, ClientError> {
        Ok(self.transport.delete_range(request.into()).await?.into())
    }

    pub async fn txn(&self, request: &TxnRequest) -> Result<TxnResponse, ClientError> {
        Ok(self.transport.txn(request.into()).await?.try_into()?)
    }

    pub async fn compact(&self, request: &CompactRequest) -> Result<CompactResponse, ClientError> {
        Ok(self.transport.compact(request.into()).await?.into())
    }
}

impl std::fmt::Debug for KvClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvClient").finish_non_exhaustive()
    }
}
