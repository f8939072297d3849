//! Conversion between the protocol model and wire messages
//!
//! Serialization is infallible: every model request has a wire form.
//! Deserialization only fails when a transaction response op carries no
//! populated oneof, which a conforming server never sends.
//!
//! A response without a header reports revision `0`.

use crate::compare::{Compare, CompareResult, CompareTarget};
use crate::error::ProtocolError;
use crate::request::{
    CompactRequest, DeleteRequest, PutRequest, RangeRequest, Request, SortOrder, SortTarget,
    TxnOp, TxnRequest,
};
use crate::response::{
    CompactResponse, DeleteResponse, PutResponse, RangeResponse, Response, TxnResponse,
};
use crate::types::KeyValue;
use crate::wire;

/// A serialized request, tagged with the remote operation it is sent to
#[derive(Debug, Clone, PartialEq)]
pub enum WireRequest {
    Range(wire::RangeRequest),
    Put(wire::PutRequest),
    DeleteRange(wire::DeleteRangeRequest),
    Txn(wire::TxnRequest),
    Compact(wire::CompactionRequest),
}

/// A response as received from one of the remote operations
#[derive(Debug, Clone, PartialEq)]
pub enum WireResponse {
    Range(wire::RangeResponse),
    Put(wire::PutResponse),
    DeleteRange(wire::DeleteRangeResponse),
    Txn(wire::TxnResponse),
    Compact(wire::CompactionResponse),
}

/// Serialize a request into its wire message
pub fn serialize(request: &Request) -> WireRequest {
    match request {
        Request::Range(r) => WireRequest::Range(r.into()),
        Request::Put(r) => WireRequest::Put(r.into()),
        Request::Delete(r) => WireRequest::DeleteRange(r.into()),
        Request::Txn(r) => WireRequest::Txn(r.into()),
        Request::Compact(r) => WireRequest::Compact(r.into()),
    }
}

/// Deserialize a wire response into the matching model response
pub fn deserialize(response: WireResponse) -> Result<Response, ProtocolError> {
    Ok(match response {
        WireResponse::Range(r) => Response::Range(r.into()),
        WireResponse::Put(r) => Response::Put(r.into()),
        WireResponse::DeleteRange(r) => Response::Delete(r.into()),
        WireResponse::Txn(r) => Response::Txn(r.try_into()?),
        WireResponse::Compact(r) => Response::Compact(r.into()),
    })
}

/// Absent in, absent out
pub fn deserialize_opt<W, M: From<W>>(message: Option<W>) -> Option<M> {
    message.map(M::from)
}

fn header_revision(header: Option<wire::ResponseHeader>) -> i64 {
    header.map(|h| h.revision).unwrap_or_default()
}

impl From<wire::KeyValue> for KeyValue {
    fn from(kv: wire::KeyValue) -> Self {
        Self {
            key: kv.key,
            value: kv.value,
            create_revision: kv.create_revision,
            mod_revision: kv.mod_revision,
            version: kv.version,
        }
    }
}

impl From<&KeyValue> for wire::KeyValue {
    fn from(kv: &KeyValue) -> Self {
        Self {
            key: kv.key.clone(),
            create_revision: kv.create_revision,
            mod_revision: kv.mod_revision,
            version: kv.version,
            value: kv.value.clone(),
            lease: 0,
        }
    }
}

impl From<SortTarget> for wire::SortTarget {
    fn from(target: SortTarget) -> Self {
        match target {
            SortTarget::Key => wire::SortTarget::Key,
            SortTarget::Version => wire::SortTarget::Version,
            SortTarget::CreateRevision => wire::SortTarget::Create,
            SortTarget::ModRevision => wire::SortTarget::Mod,
            SortTarget::Value => wire::SortTarget::Value,
        }
    }
}

impl From<SortOrder> for wire::SortOrder {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::None => wire::SortOrder::None,
            SortOrder::Ascend => wire::SortOrder::Ascend,
            SortOrder::Descend => wire::SortOrder::Descend,
        }
    }
}

impl From<&RangeRequest> for wire::RangeRequest {
    fn from(r: &RangeRequest) -> Self {
        Self {
            key: r.key.clone(),
            range_end: r.range_end.clone(),
            limit: r.limit,
            revision: r.revision,
            sort_order: wire::SortOrder::from(r.sort_order) as i32,
            sort_target: wire::SortTarget::from(r.sort_target) as i32,
            serializable: false,
            keys_only: r.keys_only,
            count_only: r.count_only,
            min_mod_revision: r.min_mod_revision,
            max_mod_revision: r.max_mod_revision,
            min_create_revision: r.min_create_revision,
            max_create_revision: r.max_create_revision,
        }
    }
}

impl From<wire::RangeResponse> for RangeResponse {
    fn from(r: wire::RangeResponse) -> Self {
        Self {
            revision: header_revision(r.header),
            count: r.count,
            more: r.more,
            kvs: r.kvs.into_iter().map(KeyValue::from).collect(),
        }
    }
}

impl From<&PutRequest> for wire::PutRequest {
    fn from(r: &PutRequest) -> Self {
        Self {
            key: r.key.clone(),
            value: r.value.clone(),
            lease: 0,
            prev_kv: r.prev_kv,
            ignore_value: r.ignore_value,
            ignore_lease: false,
        }
    }
}

impl From<wire::PutResponse> for PutResponse {
    fn from(r: wire::PutResponse) -> Self {
        Self {
            revision: header_revision(r.header),
            prev_kv: deserialize_opt(r.prev_kv),
        }
    }
}

impl From<&DeleteRequest> for wire::DeleteRangeRequest {
    fn from(r: &DeleteRequest) -> Self {
        Self {
            key: r.key.clone(),
            range_end: r.range_end.clone(),
            prev_kv: r.prev_kv,
        }
    }
}

impl From<wire::DeleteRangeResponse> for DeleteResponse {
    fn from(r: wire::DeleteRangeResponse) -> Self {
        Self {
            revision: header_revision(r.header),
            deleted: r.deleted,
            prev_kvs: r.prev_kvs.into_iter().map(KeyValue::from).collect(),
        }
    }
}

impl From<&CompactRequest> for wire::CompactionRequest {
    fn from(r: &CompactRequest) -> Self {
        Self {
            revision: r.revision,
            physical: r.physical,
        }
    }
}

impl From<wire::CompactionResponse> for CompactResponse {
    fn from(r: wire::CompactionResponse) -> Self {
        Self {
            revision: header_revision(r.header),
        }
    }
}

impl From<&Compare> for wire::Compare {
    fn from(c: &Compare) -> Self {
        use wire::compare::TargetUnion;

        let (target, union) = match &c.target {
            CompareTarget::ModRevision(rev) => (wire::CompareTarget::Mod, TargetUnion::ModRevision(*rev)),
            CompareTarget::CreateRevision(rev) => {
                (wire::CompareTarget::Create, TargetUnion::CreateRevision(*rev))
            }
            CompareTarget::Version(v) => (wire::CompareTarget::Version, TargetUnion::Version(*v)),
            CompareTarget::Value(v) => (wire::CompareTarget::Value, TargetUnion::Value(v.clone())),
        };
        let result = match c.result {
            CompareResult::Equal => wire::CompareResult::Equal,
            CompareResult::Greater => wire::CompareResult::Greater,
            CompareResult::Less => wire::CompareResult::Less,
            CompareResult::NotEqual => wire::CompareResult::NotEqual,
        };

        Self {
            result: result as i32,
            target: target as i32,
            key: c.key.clone(),
            target_union: Some(union),
            range_end: Vec::new(),
        }
    }
}

impl TryFrom<wire::Compare> for Compare {
    type Error = ProtocolError;

    fn try_from(c: wire::Compare) -> Result<Self, Self::Error> {
        use wire::compare::TargetUnion;

        let result = match wire::CompareResult::try_from(c.result) {
            Ok(wire::CompareResult::Equal) => CompareResult::Equal,
            Ok(wire::CompareResult::Greater) => CompareResult::Greater,
            Ok(wire::CompareResult::Less) => CompareResult::Less,
            Ok(wire::CompareResult::NotEqual) => CompareResult::NotEqual,
            Err(_) => return Err(ProtocolError::InvalidCompareResult(c.result)),
        };
        let (selector, target) = match c.target_union {
            Some(TargetUnion::ModRevision(rev)) => {
                (wire::CompareTarget::Mod, CompareTarget::ModRevision(rev))
            }
            Some(TargetUnion::CreateRevision(rev)) => {
                (wire::CompareTarget::Create, CompareTarget::CreateRevision(rev))
            }
            Some(TargetUnion::Version(v)) => (wire::CompareTarget::Version, CompareTarget::Version(v)),
            Some(TargetUnion::Value(v)) => (wire::CompareTarget::Value, CompareTarget::Value(v)),
            Some(TargetUnion::Lease(_)) => return Err(ProtocolError::UnsupportedCompareTarget(c.target)),
            None => return Err(ProtocolError::MissingCompareTarget { key: c.key }),
        };
        if c.target != selector as i32 {
            return Err(ProtocolError::MismatchedCompareTarget {
                key: c.key,
                target: c.target,
            });
        }

        Ok(Compare {
            key: c.key,
            result,
            target,
        })
    }
}

impl From<&TxnOp> for wire::RequestOp {
    fn from(op: &TxnOp) -> Self {
        use wire::request_op::Request as Op;

        let request = match op {
            TxnOp::Range(r) => Op::RequestRange(r.into()),
            TxnOp::Put(r) => Op::RequestPut(r.into()),
            TxnOp::Delete(r) => Op::RequestDeleteRange(r.into()),
            TxnOp::Txn(r) => Op::RequestTxn(r.into()),
        };
        Self {
            request: Some(request),
        }
    }
}

impl From<&TxnRequest> for wire::TxnRequest {
    fn from(r: &TxnRequest) -> Self {
        Self {
            compare: r.compare.iter().map(wire::Compare::from).collect(),
            success: r.success.iter().map(wire::RequestOp::from).collect(),
            failure: r.failure.iter().map(wire::RequestOp::from).collect(),
        }
    }
}

impl TryFrom<wire::ResponseOp> for Response {
    type Error = ProtocolError;

    fn try_from(op: wire::ResponseOp) -> Result<Self, Self::Error> {
        use wire::response_op::Response as Op;

        match op.response.ok_or(ProtocolError::EmptyResponseOp)? {
            Op::ResponseRange(r) => Ok(Response::Range(r.into())),
            Op::ResponsePut(r) => Ok(Response::Put(r.into())),
            Op::ResponseDeleteRange(r) => Ok(Response::Delete(r.into())),
            Op::ResponseTxn(r) => Ok(Response::Txn(r.try_into()?)),
        }
    }
}

impl TryFrom<wire::TxnResponse> for TxnResponse {
    type Error = ProtocolError;

    fn try_from(r: wire::TxnResponse) -> Result<Self, Self::Error> {
        let responses = r
            .responses
            .into_iter()
            .map(Response::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            revision: header_revision(r.header),
            succeeded: r.succeeded,
            responses,
        })
    }
}

// Wire requests back into the model, for servers and test doubles that
// execute what a client sent.

impl From<wire::SortTarget> for SortTarget {
    fn from(target: wire::SortTarget) -> Self {
        match target {
            wire::SortTarget::Key => SortTarget::Key,
            wire::SortTarget::Version => SortTarget::Version,
            wire::SortTarget::Create => SortTarget::CreateRevision,
            wire::SortTarget::Mod => SortTarget::ModRevision,
            wire::SortTarget::Value => SortTarget::Value,
        }
    }
}

impl From<wire::SortOrder> for SortOrder {
    fn from(order: wire::SortOrder) -> Self {
        match order {
            wire::SortOrder::None => SortOrder::None,
            wire::SortOrder::Ascend => SortOrder::Ascend,
            wire::SortOrder::Descend => SortOrder::Descend,
        }
    }
}

impl From<wire::RangeRequest> for RangeRequest {
    fn from(r: wire::RangeRequest) -> Self {
        Self {
            sort_target: r.sort_target().into(),
            sort_order: r.sort_order().into(),
            key: r.key,
            range_end: r.range_end,
            limit: r.limit,
            revision: r.revision,
            keys_only: r.keys_only,
            count_only: r.count_only,
            min_mod_revision: r.min_mod_revision,
            max_mod_revision: r.max_mod_revision,
            min_create_revision: r.min_create_revision,
            max_create_revision: r.max_create_revision,
        }
    }
}

impl From<wire::PutRequest> for PutRequest {
    fn from(r: wire::PutRequest) -> Self {
        Self {
            key: r.key,
            value: r.value,
            prev_kv: r.prev_kv,
            ignore_value: r.ignore_value,
        }
    }
}

impl From<wire::DeleteRangeRequest> for DeleteRequest {
    fn from(r: wire::DeleteRangeRequest) -> Self {
        Self {
            key: r.key,
            range_end: r.range_end,
            prev_kv: r.prev_kv,
        }
    }
}

impl From<wire::CompactionRequest> for CompactRequest {
    fn from(r: wire::CompactionRequest) -> Self {
        Self {
            revision: r.revision,
            physical: r.physical,
        }
    }
}

impl TryFrom<wire::RequestOp> for TxnOp {
    type Error = ProtocolError;

    fn try_from(op: wire::RequestOp) -> Result<Self, Self::Error> {
        use wire::request_op::Request as Op;

        match op.request.ok_or(ProtocolError::EmptyRequestOp)? {
            Op::RequestRange(r) => Ok(TxnOp::Range(r.into())),
            Op::RequestPut(r) => Ok(TxnOp::Put(r.into())),
            Op::RequestDeleteRange(r) => Ok(TxnOp::Delete(r.into())),
            Op::RequestTxn(r) => Ok(TxnOp::Txn(r.try_into()?)),
        }
    }
}

impl TryFrom<wire::TxnRequest> for TxnRequest {
    type Error = ProtocolError;

    fn try_from(r: wire::TxnRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            compare: r
                .compare
                .into_iter()
                .map(Compare::try_from)
                .collect::<Result<_, _>>()?,
            success: r
                .success
                .into_iter()
                .map(TxnOp::try_from)
                .collect::<Result<_, _>>()?,
            failure: r
                .failure
                .into_iter()
                .map(TxnOp::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

// Model responses onto the wire, the reverse of `deserialize`.

fn header(revision: i64) -> Option<wire::ResponseHeader> {
    Some(wire::ResponseHeader {
        revision,
        ..Default::default()
    })
}

impl From<&RangeResponse> for wire::RangeResponse {
    fn from(r: &RangeResponse) -> Self {
        Self {
            header: header(r.revision),
            kvs: r.kvs.iter().map(wire::KeyValue::from).collect(),
            more: r.more,
            count: r.count,
        }
    }
}

impl From<&PutResponse> for wire::PutResponse {
    fn from(r: &PutResponse) -> Self {
        Self {
            header: header(r.revision),
            prev_kv: r.prev_kv.as_ref().map(wire::KeyValue::from),
        }
    }
}

impl From<&DeleteResponse> for wire::DeleteRangeResponse {
    fn from(r: &DeleteResponse) -> Self {
        Self {
            header: header(r.revision),
            deleted: r.deleted,
            prev_kvs: r.prev_kvs.iter().map(wire::KeyValue::from).collect(),
        }
    }
}

impl From<&CompactResponse> for wire::CompactionResponse {
    fn from(r: &CompactResponse) -> Self {
        Self {
            header: header(r.revision),
        }
    }
}

impl From<&TxnResponse> for wire::TxnResponse {
    fn from(r: &TxnResponse) -> Self {
        use wire::response_op::Response as Op;

        let responses = r
            .responses
            .iter()
            .map(|response| wire::ResponseOp {
                response: match response {
                    Response::Range(r) => Some(Op::ResponseRange(r.into())),
                    Response::Put(r) => Some(Op::ResponsePut(r.into())),
                    Response::Delete(r) => Some(Op::ResponseDeleteRange(r.into())),
                    Response::Txn(r) => Some(Op::ResponseTxn(r.into())),
                    // never part of a transaction
                    Response::Compact(_) => None,
                },
            })
            .collect();
        Self {
            header: header(r.revision),
            succeeded: r.succeeded,
            responses,
        }
    }
}
