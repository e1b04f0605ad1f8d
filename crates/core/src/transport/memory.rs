//! In-process transport, every node of a ring lives in the same runtime.
//! Used by tests and local simulations.

use std::sync::Arc;
use std::sync::Weak;

use async_trait::async_trait;
use dashmap::DashMap;

use super::Transport;
use crate::dht::NodeRef;
use crate::error::Error;
use crate::error::Result;
use crate::message::MessageHandler;
use crate::message::Request;
use crate::message::Response;
use crate::swarm::Swarm;

/// Routes requests to swarms registered under their endpoint.
/// A node that is not registered, or has been dropped, is unreachable.
#[derive(Default)]
pub struct MemoryTransport {
    hub: DashMap<String, Weak<Swarm>>,
}

impl MemoryTransport {
    /// Empty hub, nothing is reachable yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `swarm` reachable under its endpoint.
    pub fn register(&self, swarm: &Arc<Swarm>) {
        self.hub
            .insert(swarm.node().endpoint.clone(), Arc::downgrade(swarm));
    }

    /// Make `endpoint` unreachable, the node behaves as crashed from the outside.
    pub fn unregister(&self, endpoint: &str) -> bool {
        self.hub.remove(endpoint).is_some()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn request(&self, target: &NodeRef, req: Request) -> Result<Response> {
        let swarm = self
            .hub
            .get(&target.endpoint)
            .and_then(|r| r.value().upgrade())
            .ok_or_else(|| Error::Unreachable(target.endpoint.clone()))?;
        MessageHandler::new(swarm).handle_request(req).await
    }
}
