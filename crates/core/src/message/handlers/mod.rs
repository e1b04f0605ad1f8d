#![warn(missing_docs)]
//! This module implemented message handler of chordkv nodes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Error;
use crate::error::Result;
use crate::message::types::Request;
use crate::message::types::Response;
use crate::swarm::Swarm;

/// Handlers for ring maintenance and lookups
pub mod dht;
/// Handlers for storage and replication
pub mod storage;

/// MessageHandler answers the requests addressed to one node.
#[derive(Clone)]
pub struct MessageHandler {
    swarm: Arc<Swarm>,
}

/// Generic trait for handle message ,inspired by Actor-Model.
#[async_trait]
pub trait HandleMsg<T> {
    /// Message handler.
    async fn handle(&self, msg: &T) -> Result<Response>;
}

impl MessageHandler {
    /// Create a new MessageHandler instance.
    pub fn new(swarm: Arc<Swarm>) -> Self {
        Self { swarm }
    }

    /// Dispatch `req` to its handler.
    ///
    /// A failure to reach some other node while serving the request is reported as the
    /// failure of the operation, never as [Error::Unreachable], which callers reserve for
    /// this node itself.
    pub async fn handle_request(&self, req: Request) -> Result<Response> {
        tracing::debug!("{} handles {}", self.swarm.node(), req);
        let ret = match &req {
            Request::FindSuccessor(msg) => self.handle(msg).await,
            Request::GetPredecessor(msg) => self.handle(msg).await,
            Request::QueryForTopoInfo(msg) => self.handle(msg).await,
            Request::NotifyPredecessor(msg) => self.handle(msg).await,
            Request::Ping(msg) => self.handle(msg).await,
            Request::Stats(msg) => self.handle(msg).await,
            Request::Put(msg) => self.handle(msg).await,
            Request::Get(msg) => self.handle(msg).await,
            Request::Delete(msg) => self.handle(msg).await,
            Request::StoreKey(msg) => self.handle(msg).await,
            Request::FetchKey(msg) => self.handle(msg).await,
            Request::ReplicatePush(msg) => self.handle(msg).await,
            Request::ReplicateDelete(msg) => self.handle(msg).await,
            Request::TransferKeys(msg) => self.handle(msg).await,
        };
        ret.map_err(|e| match e {
            Error::Unreachable(endpoint) => {
                tracing::debug!("{} failed, {} is unreachable", req, endpoint);
                match &req {
                    Request::FindSuccessor(msg) => Error::RoutingExhausted {
                        did: msg.did,
                        hops: msg.hops,
                    },
                    Request::Put(msg) => Error::KeyUnavailable(msg.key.clone()),
                    Request::Get(msg) => Error::KeyUnavailable(msg.key.clone()),
                    Request::Delete(msg) => Error::KeyUnavailable(msg.key.clone()),
                    Request::StoreKey(msg) => Error::KeyUnavailable(msg.entry.key.clone()),
                    Request::FetchKey(msg) => Error::KeyUnavailable(msg.key.clone()),
                    _ => Error::RemoteFailure(format!("{} is unreachable", endpoint)),
                }
            }
            e => e,
        })
    }
}
