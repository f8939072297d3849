//! Transport doubles for harness tests

#![allow(dead_code)]

use async_trait::async_trait;
use revbench_client::{KvClient, KvTransport};
use revbench_kv::wire;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tonic::Status;

/// Answers every call after a fixed delay, counting calls per operation.
///
/// Ranges fail with `range_error` when one is set.
#[derive(Default)]
pub struct FakeStore {
    pub delay: Duration,
    pub range_error: Option<String>,
    pub revision: AtomicI64,
    pub ranges: AtomicUsize,
    pub puts: AtomicUsize,
    pub txns: AtomicUsize,
}

impl FakeStore {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Default::default()
        })
    }

    pub fn failing_ranges(delay: Duration, message: &str) -> Arc<Self> {
        Arc::new(Self {
            delay,
            range_error: Some(message.to_string()),
            ..Default::default()
        })
    }

    pub fn clients(self: &Arc<Self>, n: usize) -> Vec<KvClient> {
        (0..n).map(|_| KvClient::new(self.clone())).collect()
    }

    pub fn calls(&self) -> usize {
        self.ranges.load(Ordering::SeqCst)
            + self.puts.load(Ordering::SeqCst)
            + self.txns.load(Ordering::SeqCst)
    }

    fn header(&self, write: bool) -> Option<wire::ResponseHeader> {
        let revision = if write {
            self.revision.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            self.revision.load(Ordering::SeqCst)
        };
        Some(wire::ResponseHeader {
            revision,
            ..Default::default()
        })
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl KvTransport for FakeStore {
    async fn range(&self, _: wire::RangeRequest) -> Result<wire::RangeResponse, Status> {
        self.pause().await;
        self.ranges.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.range_error {
            return Err(Status::unavailable(message.clone()));
        }
        Ok(wire::RangeResponse {
            header: self.header(false),
            ..Default::default()
        })
    }

    async fn put(&self, _: wire::PutRequest) -> Result<wire::PutResponse, Status> {
        self.pause().await;
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(wire::PutResponse {
            header: self.header(true),
            prev_kv: None,
        })
    }

    async fn delete_range(
        &self,
        _: wire::DeleteRangeRequest,
    ) -> Result<wire::DeleteRangeResponse, Status> {
        Err(Status::unimplemented("delete_range"))
    }

    async fn txn(&self, request: wire::TxnRequest) -> Result<wire::TxnResponse, Status> {
        self.pause().await;
        self.txns.fetch_add(1, Ordering::SeqCst);
        let write = request.success.iter().any(|op| {
            matches!(op.request, Some(wire::request_op::Request::RequestPut(_)))
        });
        Ok(wire::TxnResponse {
            header: self.header(write),
            succeeded: true,
            responses: Vec::new(),
        })
    }

    async fn compact(
        &self,
        _: wire::CompactionRequest,
    ) -> Result<wire::CompactionResponse, Status> {
        Err(Status::unimplemented("compact"))
    }
}
