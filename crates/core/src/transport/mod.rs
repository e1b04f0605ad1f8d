#![warn(missing_docs)]
//! Transport between chordkv nodes.
//!
//! A [Transport] carries one [Request] to one node and brings the [Response] back. Nodes never
//! talk to a transport directly, they go through [PeerClient], which bounds every call by a
//! timeout and unpacks responses into typed results.
//!
//! Writes, deletes and probing reads make the target call further nodes before it answers.
//! Those calls get the forward timeout, which covers the nested calls, so a slow replica
//! behind a live owner is never reported as the owner being unreachable.

pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::dht::Did;
use crate::dht::NodeRef;
use crate::dht::TopoInfo;
use crate::error::Error;
use crate::error::Result;
use crate::inspect::NodeStats;
use crate::message::*;
use crate::storage::Entry;

pub use self::memory::MemoryTransport;

/// Carry a request to `target` and wait for its response.
///
/// Implementations must return [Error::Unreachable] when the target cannot be contacted,
/// any other error is taken as an answer of the target itself.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `req` to `target`.
    async fn request(&self, target: &NodeRef, req: Request) -> Result<Response>;
}

/// Typed remote calls over a [Transport].
#[derive(Clone)]
pub struct PeerClient {
    transport: Arc<dyn Transport>,
    timeout: Duration,
    forward_timeout: Duration,
}

macro_rules! expect_response {
    ($resp:expr, $variant:path) => {
        match $resp {
            $variant(x) => Ok(x),
            other => Err(Error::UnexpectedResponse(format!("{:?}", other))),
        }
    };
}

impl PeerClient {
    /// Wrap a transport, every call fails as unreachable after `timeout`.
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            forward_timeout: timeout,
        }
    }

    /// Bound the calls that make the target call further nodes by `timeout` instead.
    pub fn forward_timeout(mut self, timeout: Duration) -> Self {
        self.forward_timeout = timeout.max(self.timeout);
        self
    }

    /// Time `target` is given to answer `req`.
    pub fn timeout_of(&self, req: &Request) -> Duration {
        match req {
            Request::Put(_) | Request::StoreKey(_) | Request::Delete(_) => self.forward_timeout,
            Request::FetchKey(FetchKeySend {
                probe_successor: true,
                ..
            }) => self.forward_timeout,
            _ => self.timeout,
        }
    }

    /// Send a raw request.
    pub async fn request(&self, target: &NodeRef, req: Request) -> Result<Response> {
        tracing::trace!("request {} to {}", req, target);
        let timeout = self.timeout_of(&req);
        match tokio::time::timeout(timeout, self.transport.request(target, req)).await {
            Ok(resp) => resp,
            Err(_) => {
                tracing::debug!("request to {} timed out after {:?}", target, timeout);
                Err(Error::Unreachable(target.endpoint.clone()))
            }
        }
    }

    /// Ask `target` to resolve the successor of `did`.
    pub async fn find_successor(
        &self,
        target: &NodeRef,
        did: Did,
        hops: u32,
    ) -> Result<FindSuccessorReport> {
        let resp = self
            .request(
                target,
                Request::FindSuccessor(FindSuccessorSend { did, hops }),
            )
            .await?;
        expect_response!(resp, Response::FindSuccessor)
    }

    /// Successor list and predecessor of `target`.
    pub async fn topo_info(&self, target: &NodeRef) -> Result<TopoInfo> {
        let resp = self
            .request(target, Request::QueryForTopoInfo(QueryForTopoInfoSend {}))
            .await?;
        expect_response!(resp, Response::TopoInfo).map(|r| r.info)
    }

    /// Tell `target` that `node` may be its predecessor.
    pub async fn notify(&self, target: &NodeRef, node: NodeRef) -> Result<Option<NodeRef>> {
        let resp = self
            .request(
                target,
                Request::NotifyPredecessor(NotifyPredecessorSend { node }),
            )
            .await?;
        expect_response!(resp, Response::NotifyPredecessor).map(|r| r.predecessor)
    }

    /// Liveness probe.
    pub async fn ping(&self, target: &NodeRef) -> Result<Did> {
        let resp = self.request(target, Request::Ping(PingSend {})).await?;
        expect_response!(resp, Response::Pong).map(|r| r.did)
    }

    /// Client write through `target`.
    pub async fn put(
        &self,
        target: &NodeRef,
        key: &str,
        value: Vec<u8>,
        hops: u32,
    ) -> Result<StoreReport> {
        let resp = self
            .request(
                target,
                Request::Put(PutSend {
                    key: key.to_string(),
                    value,
                    hops,
                }),
            )
            .await?;
        expect_response!(resp, Response::Stored)
    }

    /// Client delete through `target`.
    pub async fn delete(&self, target: &NodeRef, key: &str, hops: u32) -> Result<DeleteReport> {
        let resp = self
            .request(
                target,
                Request::Delete(DeleteSend {
                    key: key.to_string(),
                    hops,
                }),
            )
            .await?;
        expect_response!(resp, Response::Deleted)
    }

    /// Install `entry` at its owner, `target` forwards when it does not own the key.
    pub async fn store(&self, target: &NodeRef, entry: Entry, hops: u32) -> Result<StoreReport> {
        let resp = self
            .request(target, Request::StoreKey(StoreKeySend { entry, hops }))
            .await?;
        expect_response!(resp, Response::Stored)
    }

    /// Read the local store of `target`.
    pub async fn fetch(
        &self,
        target: &NodeRef,
        key: &str,
        probe_successor: bool,
    ) -> Result<Option<Entry>> {
        let resp = self
            .request(
                target,
                Request::FetchKey(FetchKeySend {
                    key: key.to_string(),
                    probe_successor,
                }),
            )
            .await?;
        expect_response!(resp, Response::Fetched).map(|r| r.entry)
    }

    /// Push a replica copy to `target`.
    pub async fn replicate_push(&self, target: &NodeRef, entry: Entry) -> Result<bool> {
        let resp = self
            .request(target, Request::ReplicatePush(ReplicatePushSend { entry }))
            .await?;
        expect_response!(resp, Response::Ack).map(|r| r.changed)
    }

    /// Drop the replica copy of `key` at `target`.
    pub async fn replicate_delete(&self, target: &NodeRef, key: &str) -> Result<bool> {
        let resp = self
            .request(
                target,
                Request::ReplicateDelete(ReplicateDeleteSend {
                    key: key.to_string(),
                }),
            )
            .await?;
        expect_response!(resp, Response::Ack).map(|r| r.changed)
    }

    /// Take over the primaries `target` holds in (start, end].
    pub async fn transfer_keys(&self, target: &NodeRef, start: Did, end: Did) -> Result<Vec<Entry>> {
        let resp = self
            .request(
                target,
                Request::TransferKeys(TransferKeysSend { start, end }),
            )
            .await?;
        expect_response!(resp, Response::Transferred).map(|r| r.entries)
    }

    /// Introspection of `target`.
    pub async fn stats(&self, target: &NodeRef) -> Result<NodeStats> {
        let resp = self.request(target, Request::Stats(StatsSend {})).await?;
        expect_response!(resp, Response::Stats).map(|s| *s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch(probe_successor: bool) -> Request {
        Request::FetchKey(FetchKeySend {
            key: "apple".to_string(),
            probe_successor,
        })
    }

    #[test]
    fn test_forwarded_calls_get_forward_timeout() {
        let single = Duration::from_millis(100);
        let forward = Duration::from_millis(700);
        let client =
            PeerClient::new(Arc::new(MemoryTransport::new()), single).forward_timeout(forward);

        let put = Request::Put(PutSend {
            key: "apple".to_string(),
            value: b"red".to_vec(),
            hops: 0,
        });
        let delete = Request::Delete(DeleteSend {
            key: "apple".to_string(),
            hops: 1,
        });
        assert_eq!(client.timeout_of(&put), forward);
        assert_eq!(client.timeout_of(&delete), forward);
        assert_eq!(client.timeout_of(&fetch(true)), forward);
        assert_eq!(client.timeout_of(&fetch(false)), single);
        assert_eq!(client.timeout_of(&Request::Ping(PingSend {})), single);

        // never shorter than a single call
        let client = client.forward_timeout(Duration::from_millis(10));
        assert_eq!(client.timeout_of(&put), single);
    }
}
