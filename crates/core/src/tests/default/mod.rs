use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashSet;

use crate::consts::ID_BITS;
use crate::dht::Did;
use crate::dht::NodeRef;
use crate::dht::Stabilizer;
use crate::dht::SuccessorReader;
use crate::error::Result;
use crate::message::Request;
use crate::message::Response;
use crate::storage::Entry;
use crate::storage::Role;
use crate::swarm::Swarm;
use crate::swarm::SwarmBuilder;
use crate::transport::MemoryTransport;
use crate::transport::Transport;

mod test_replication;
mod test_stabilization;

/// Passes requests to a [MemoryTransport], except those to a stalled endpoint, which never
/// get an answer.
pub struct StallingTransport {
    hub: Arc<MemoryTransport>,
    stalled: DashSet<String>,
}

impl StallingTransport {
    pub fn new(hub: Arc<MemoryTransport>) -> Self {
        Self {
            hub,
            stalled: DashSet::new(),
        }
    }

    pub fn stall(&self, endpoint: &str) {
        self.stalled.insert(endpoint.to_string());
    }

    pub fn resume(&self, endpoint: &str) {
        self.stalled.remove(endpoint);
    }
}

#[async_trait]
impl Transport for StallingTransport {
    async fn request(&self, target: &NodeRef, req: Request) -> Result<Response> {
        if self.stalled.contains(&target.endpoint) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.hub.request(target, req).await
    }
}

/// Nodes sharing one in-process transport.
pub struct Ring {
    pub transport: Arc<MemoryTransport>,
    pub stalling: Arc<StallingTransport>,
    pub nodes: Vec<Arc<Swarm>>,
    pub replication_factor: u8,
    pub rpc_timeout: Duration,
}

pub fn prepare_node(transport: &Arc<MemoryTransport>, endpoint: &str, r: u8) -> Arc<Swarm> {
    let swarm = Arc::new(
        SwarmBuilder::new(endpoint, transport.clone())
            .replication_factor(r)
            .rpc_timeout(Duration::from_secs(5))
            .build()
            .unwrap(),
    );
    transport.register(&swarm);
    swarm
}

impl Ring {
    pub fn new(r: u8) -> Self {
        Self::with_rpc_timeout(r, Duration::from_secs(5))
    }

    pub fn with_rpc_timeout(r: u8, rpc_timeout: Duration) -> Self {
        let transport = Arc::new(MemoryTransport::new());
        Self {
            stalling: Arc::new(StallingTransport::new(transport.clone())),
            transport,
            nodes: vec![],
            replication_factor: r,
            rpc_timeout,
        }
    }

    /// A settled ring of `n` nodes, all joined through the first one.
    pub async fn with_nodes(n: usize, r: u8) -> Self {
        Self::settled(Self::new(r), n).await
    }

    /// A settled ring of `n` nodes whose remote calls time out after `rpc_timeout`.
    pub async fn with_nodes_and_timeout(n: usize, r: u8, rpc_timeout: Duration) -> Self {
        Self::settled(Self::with_rpc_timeout(r, rpc_timeout), n).await
    }

    async fn settled(mut ring: Self, n: usize) -> Self {
        for i in 0..n {
            ring.add_node(&format!("node-{}", i)).await;
        }
        ring.settle().await;
        ring
    }

    pub async fn add_node(&mut self, endpoint: &str) -> Arc<Swarm> {
        let swarm = Arc::new(
            SwarmBuilder::new(endpoint, self.stalling.clone())
                .replication_factor(self.replication_factor)
                .rpc_timeout(self.rpc_timeout)
                .build()
                .unwrap(),
        );
        self.transport.register(&swarm);
        match self.nodes.first() {
            None => swarm.create().unwrap(),
            Some(first) => swarm.join(&first.node().endpoint).await.unwrap(),
        }
        self.nodes.push(swarm.clone());
        swarm
    }

    /// Crash `endpoint`: unreachable from now on, and out of the ring.
    pub fn kill(&mut self, endpoint: &str) -> Arc<Swarm> {
        assert!(self.transport.unregister(endpoint));
        let idx = self
            .nodes
            .iter()
            .position(|n| n.node().endpoint == endpoint)
            .unwrap();
        self.nodes.remove(idx)
    }

    /// Run maintenance rounds until the ring is closed, then fix all fingers and sweep.
    pub async fn settle(&self) {
        for _ in 0..(self.nodes.len() * 2 + 2) {
            self.stabilize_round().await;
            if self.is_closed() {
                break;
            }
        }
        self.stabilize_round().await;
        for node in self.nodes.iter() {
            fix_all_fingers(node).await;
        }
        self.sweep_round().await;
        // let sweeps spawned on predecessor changes finish
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.sweep_round().await;
    }

    /// Every node drops its predecessor if it stopped answering.
    pub async fn check_predecessors(&self) {
        for node in self.nodes.iter() {
            Stabilizer::new(node.clone())
                .check_predecessor()
                .await
                .unwrap();
        }
    }

    pub async fn stabilize_round(&self) {
        for node in self.nodes.iter() {
            let stabilizer = Stabilizer::new(node.clone());
            if let Err(e) = stabilizer.check_predecessor().await {
                println!("check_predecessor of {} failed: {:?}", node.node(), e);
            }
            if let Err(e) = stabilizer.stabilize().await {
                println!("stabilize of {} failed: {:?}", node.node(), e);
            }
        }
    }

    pub async fn sweep_round(&self) {
        for node in self.nodes.iter() {
            if let Err(e) = node.sweep().await {
                println!("sweep of {} failed: {:?}", node.node(), e);
            }
        }
    }

    /// Nodes in clockwise order from the smallest did.
    pub fn sorted(&self) -> Vec<Arc<Swarm>> {
        let mut nodes = self.nodes.clone();
        nodes.sort_by_key(|n| n.did());
        nodes
    }

    /// Every node has the next node as successor and the previous one as predecessor,
    /// and a full successor list.
    pub fn is_closed(&self) -> bool {
        let sorted = self.sorted();
        let n = sorted.len();
        let want = (self.replication_factor as usize).min(n - 1);
        (0..n).all(|i| {
            let node = &sorted[i];
            let next = &sorted[(i + 1) % n];
            let prev = &sorted[(i + n - 1) % n];
            let expected: Vec<NodeRef> = (1..=want)
                .map(|k| sorted[(i + k) % n].node().clone())
                .collect();
            node.dht().successor().unwrap() == *next.node()
                && node.dht().predecessor().unwrap() == Some(prev.node().clone())
                && node.dht().successors().list().unwrap() == expected
        })
    }

    /// The node whose range (predecessor, self] covers `did`.
    pub fn expected_owner(&self, did: Did) -> Arc<Swarm> {
        let sorted = self.sorted();
        sorted
            .iter()
            .find(|n| n.did() >= did)
            .unwrap_or(&sorted[0])
            .clone()
    }

    pub fn node(&self, endpoint: &str) -> Arc<Swarm> {
        self.nodes
            .iter()
            .find(|n| n.node().endpoint == endpoint)
            .unwrap()
            .clone()
    }

    /// Copies of `key` held across the ring as (node endpoint, entry).
    pub async fn copies(&self, key: &str) -> Vec<(String, Entry)> {
        let did = Did::from_key(key);
        let mut ret = vec![];
        for node in self.nodes.iter() {
            if let Some(e) = node.store().get(did).await.unwrap() {
                ret.push((node.node().endpoint.clone(), e));
            }
        }
        ret
    }

    pub async fn primaries(&self, key: &str) -> Vec<String> {
        self.copies(key)
            .await
            .into_iter()
            .filter(|(_, e)| e.role == Role::Primary)
            .map(|(n, _)| n)
            .collect()
    }
}

pub async fn fix_all_fingers(swarm: &Arc<Swarm>) {
    let stabilizer = Stabilizer::new(swarm.clone());
    for _ in 0..ID_BITS {
        stabilizer.fix_fingers().await.unwrap();
    }
}
