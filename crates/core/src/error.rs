//! Error of chordkv_core

use crate::dht::Did;
use crate::dht::PeerRingAction;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors collections in chordkv-core.
///
/// The first four variants form the error taxonomy seen across the wire. The rest are local
/// failures that never leave the node untranslated.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Remote node {0} is unreachable")]
    Unreachable(String),

    #[error("Routing for {did} exhausted after {hops} hops")]
    RoutingExhausted { did: Did, hops: u32 },

    #[error("Key {0} is unavailable, no replica holder answered")]
    KeyUnavailable(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Remote node failed: {0}")]
    RemoteFailure(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Failed on read successors")]
    FailedToReadSuccessors,

    #[error("Failed on write successors")]
    FailedToWriteSuccessors,

    #[error("DHT lock failed")]
    DHTSyncLockError,

    #[error("Unexpected PeerRingAction, {0:?}")]
    PeerRingUnexpectedAction(PeerRingAction),

    #[error("JSON serialization error")]
    Serialize(#[source] serde_json::Error),

    #[error("JSON deserialization error")]
    Deserialize(#[source] serde_json::Error),
}

impl Error {
    /// Whether the error means the remote target itself could not be reached.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}
