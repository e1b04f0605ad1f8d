#![warn(missing_docs)]
//! This module defines the messages exchanged between chordkv nodes and clients.
//! Messages follow the Send/Report pattern: every request payload `xxxSend` is answered by
//! a report payload, both wrapped into [Request] and [Response].

use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;
use crate::dht::NodeRef;
use crate::dht::TopoInfo;
use crate::inspect::NodeStats;
use crate::storage::Entry;

/// MessageType use to find successor in a chord ring.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FindSuccessorSend {
    /// did of target
    pub did: Did,
    /// hops already taken by this lookup
    #[serde(default)]
    pub hops: u32,
}

/// MessageType use to report the successor found.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FindSuccessorReport {
    /// the node owning the target did
    pub node: NodeRef,
    /// hops taken by the whole lookup
    pub hops: u32,
}

/// MessageType use to ask a node for its predecessor.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct GetPredecessorSend {}

/// MessageType use to report a predecessor.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PredecessorReport {
    /// current predecessor, if any
    pub predecessor: Option<NodeRef>,
}

/// MessageType use to ask a node for its successor list and predecessor.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct QueryForTopoInfoSend {}

/// MessageType use to report [TopoInfo].
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct QueryForTopoInfoReport {
    /// successor list and predecessor of the queried node
    pub info: TopoInfo,
}

/// MessageType use notify the successor about the predecessor inferred by current node.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct NotifyPredecessorSend {
    /// The candidate predecessor.
    pub node: NodeRef,
}

/// MessageType use to tell the real predecessor of current node.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct NotifyPredecessorReport {
    /// The real predecessor of current node after compare.
    pub predecessor: Option<NodeRef>,
}

/// Liveness probe.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct PingSend {}

/// Liveness ack.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PongReport {
    /// did of the answering node
    pub did: Did,
}

/// Client write, routed to the owner of `key`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PutSend {
    /// key string
    pub key: String,
    /// value bytes
    #[serde(with = "crate::utils::base64_bytes")]
    pub value: Vec<u8>,
    /// hops already taken by this write
    #[serde(default)]
    pub hops: u32,
}

/// Install `entry` at the owner of its key. A REPLICA entry is installed where it lands.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StoreKeySend {
    /// entry to store
    pub entry: Entry,
    /// hops already taken by this write
    #[serde(default)]
    pub hops: u32,
}

/// Report of a primary write.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StoreReport {
    /// node holding the primary copy
    pub owner: NodeRef,
    /// version written
    pub version: u64,
    /// replicas that acknowledged the write
    pub replicas: u32,
}

/// Client read with replica fallback.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct GetSend {
    /// key string
    pub key: String,
}

/// Local read of a node's own store.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FetchKeySend {
    /// key string
    pub key: String,
    /// ask the successor when the key is owned here but missing
    #[serde(default)]
    pub probe_successor: bool,
}

/// Result of a read, `None` means the key is absent.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FetchReport {
    /// entry found
    pub entry: Option<Entry>,
}

/// Client delete, routed to the owner of `key`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DeleteSend {
    /// key string
    pub key: String,
    /// hops already taken by this delete
    #[serde(default)]
    pub hops: u32,
}

/// Report of a delete.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    /// whether the owner held the key
    pub existed: bool,
    /// replicas that acknowledged the delete
    pub replicas: u32,
}

/// Install a REPLICA copy.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ReplicatePushSend {
    /// entry pushed by the primary
    pub entry: Entry,
}

/// Drop a REPLICA copy.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ReplicateDeleteSend {
    /// key string
    pub key: String,
}

/// Acknowledge of a replica operation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AckReport {
    /// whether local state changed
    pub changed: bool,
}

/// Hand the primaries in (start, end] over to the sender.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TransferKeysSend {
    /// exclusive start of the range
    pub start: Did,
    /// inclusive end of the range
    pub end: Did,
}

/// Primaries handed over.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TransferKeysReport {
    /// entries, all with PRIMARY role
    pub entries: Vec<Entry>,
}

/// Introspection query.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct StatsSend {}

/// Requests a node serves.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub enum Request {
    /// Find the successor of a did
    FindSuccessor(FindSuccessorSend),
    /// Current predecessor
    GetPredecessor(GetPredecessorSend),
    /// Successor list and predecessor
    QueryForTopoInfo(QueryForTopoInfoSend),
    /// Candidate predecessor
    NotifyPredecessor(NotifyPredecessorSend),
    /// Liveness
    Ping(PingSend),
    /// Client write
    Put(PutSend),
    /// Client read
    Get(GetSend),
    /// Client delete
    Delete(DeleteSend),
    /// Owner side write
    StoreKey(StoreKeySend),
    /// Local read
    FetchKey(FetchKeySend),
    /// Replica install
    ReplicatePush(ReplicatePushSend),
    /// Replica drop
    ReplicateDelete(ReplicateDeleteSend),
    /// Key migration
    TransferKeys(TransferKeysSend),
    /// Introspection
    Stats(StatsSend),
}

/// Responses to [Request].
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub enum Response {
    /// Response of FindSuccessor
    FindSuccessor(FindSuccessorReport),
    /// Response of GetPredecessor
    Predecessor(PredecessorReport),
    /// Response of QueryForTopoInfo
    TopoInfo(QueryForTopoInfoReport),
    /// Response of NotifyPredecessor
    NotifyPredecessor(NotifyPredecessorReport),
    /// Response of Ping
    Pong(PongReport),
    /// Response of Put and StoreKey
    Stored(StoreReport),
    /// Response of Get and FetchKey
    Fetched(FetchReport),
    /// Response of Delete
    Deleted(DeleteReport),
    /// Response of ReplicatePush and ReplicateDelete
    Ack(AckReport),
    /// Response of TransferKeys
    Transferred(TransferKeysReport),
    /// Response of Stats
    Stats(Box<NodeStats>),
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
