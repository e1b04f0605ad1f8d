//! Rpc methods.
#![warn(missing_docs)]

use chordkv_core::message::Request;

use super::error::Error;
use super::error::Result;

/// supported methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Method {
    /// Resolve the owner of an identifier
    FindSuccessor,
    /// Current predecessor of the node
    GetPredecessor,
    /// Successor list and predecessor of the node
    QueryTopoInfo,
    /// Offer a candidate predecessor
    Notify,
    /// Liveness probe
    Ping,
    /// Client write
    Put,
    /// Client read
    Get,
    /// Client delete
    Delete,
    /// Install a primary entry at its owner
    StoreKey,
    /// Read the local store of the node
    FetchKey,
    /// Install a replica
    ReplicatePush,
    /// Drop a replica
    ReplicateDelete,
    /// Take over primaries of a range
    TransferKeys,
    /// Retrieve node stats
    Stats,
}

impl Method {
    /// Return method's name as `&str`
    pub fn as_str(&self) -> &str {
        match self {
            Method::FindSuccessor => "findSuccessor",
            Method::GetPredecessor => "getPredecessor",
            Method::QueryTopoInfo => "queryTopoInfo",
            Method::Notify => "notify",
            Method::Ping => "ping",
            Method::Put => "put",
            Method::Get => "get",
            Method::Delete => "delete",
            Method::StoreKey => "storeKey",
            Method::FetchKey => "fetchKey",
            Method::ReplicatePush => "replicatePush",
            Method::ReplicateDelete => "replicateDelete",
            Method::TransferKeys => "transferKeys",
            Method::Stats => "stats",
        }
    }

    /// Name of the [Request] variant carried by this method.
    pub(crate) fn variant(&self) -> &str {
        match self {
            Method::FindSuccessor => "FindSuccessor",
            Method::GetPredecessor => "GetPredecessor",
            Method::QueryTopoInfo => "QueryForTopoInfo",
            Method::Notify => "NotifyPredecessor",
            Method::Ping => "Ping",
            Method::Put => "Put",
            Method::Get => "Get",
            Method::Delete => "Delete",
            Method::StoreKey => "StoreKey",
            Method::FetchKey => "FetchKey",
            Method::ReplicatePush => "ReplicatePush",
            Method::ReplicateDelete => "ReplicateDelete",
            Method::TransferKeys => "TransferKeys",
            Method::Stats => "Stats",
        }
    }

    /// All methods served by a node.
    pub fn all() -> &'static [Method] {
        &[
            Method::FindSuccessor,
            Method::GetPredecessor,
            Method::QueryTopoInfo,
            Method::Notify,
            Method::Ping,
            Method::Put,
            Method::Get,
            Method::Delete,
            Method::StoreKey,
            Method::FetchKey,
            Method::ReplicatePush,
            Method::ReplicateDelete,
            Method::TransferKeys,
            Method::Stats,
        ]
    }
}

impl From<&Request> for Method {
    fn from(req: &Request) -> Self {
        match req {
            Request::FindSuccessor(_) => Method::FindSuccessor,
            Request::GetPredecessor(_) => Method::GetPredecessor,
            Request::QueryForTopoInfo(_) => Method::QueryTopoInfo,
            Request::NotifyPredecessor(_) => Method::Notify,
            Request::Ping(_) => Method::Ping,
            Request::Put(_) => Method::Put,
            Request::Get(_) => Method::Get,
            Request::Delete(_) => Method::Delete,
            Request::StoreKey(_) => Method::StoreKey,
            Request::FetchKey(_) => Method::FetchKey,
            Request::ReplicatePush(_) => Method::ReplicatePush,
            Request::ReplicateDelete(_) => Method::ReplicateDelete,
            Request::TransferKeys(_) => Method::TransferKeys,
            Request::Stats(_) => Method::Stats,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Method {
    type Error = crate::error::Error;

    fn try_from(value: &str) -> Result<Self> {
        Method::all()
            .iter()
            .find(|m| m.as_str() == value)
            .copied()
            .ok_or(Error::InvalidMethod)
    }
}
