#![warn(missing_docs)]
//! A chordkv node: ring view, local store and the remote calls tying them together.
//!
//! [Swarm] is the node service. Its operations are split by concern:
//! - `routing`: lookups with hop limit and failover,
//! - `storage`: client reads and writes, owner side store and fetch,
//! - `replication`: replica pushes, promotion, migration and periodic sweeps.

mod builder;
mod replication;
mod routing;
mod storage;

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub use builder::SwarmBuilder;
use chrono::DateTime;
use chrono::Utc;

use crate::dht::Chord;
use crate::dht::Did;
use crate::dht::NodeRef;
use crate::dht::PeerRing;
use crate::dht::PeerRingAction;
use crate::dht::PeerRingRemoteAction;
use crate::error::Error;
use crate::error::Result;
use crate::inspect::DHTInspect;
use crate::inspect::NodeStats;
use crate::storage::KeyValueStore;
use crate::transport::PeerClient;

/// A member of the ring.
pub struct Swarm {
    /// Reference of DHT.
    pub(crate) dht: Arc<PeerRing>,
    pub(crate) store: Arc<KeyValueStore>,
    pub(crate) client: PeerClient,
    /// Copies kept of every key, the primary included.
    pub(crate) replication_factor: u8,
    /// Hops a lookup may take before failing with [Error::RoutingExhausted].
    pub(crate) max_hops: u32,
    started_at: DateTime<Utc>,
    lookups: AtomicU64,
    lookup_hops: AtomicU64,
}

impl Swarm {
    /// Get did of self.
    pub fn did(&self) -> Did {
        self.dht.did
    }

    /// Reference of self, as handed to other nodes.
    pub fn node(&self) -> &NodeRef {
        &self.dht.node
    }

    /// Get DHT(Distributed Hash Table) of self.
    pub fn dht(&self) -> Arc<PeerRing> {
        self.dht.clone()
    }

    /// Local key-value store.
    pub fn store(&self) -> Arc<KeyValueStore> {
        self.store.clone()
    }

    /// Client used for every remote call of this node.
    pub fn client(&self) -> &PeerClient {
        &self.client
    }

    /// Copies kept of every key.
    pub fn replication_factor(&self) -> u8 {
        self.replication_factor
    }

    /// Start a new ring with self as the sole member.
    pub fn create(&self) -> Result<()> {
        tracing::info!("{} creates a new ring", self.node());
        self.dht.create()
    }

    /// Join the ring `bootstrap` belongs to.
    ///
    /// The successor of self is resolved through `bootstrap` and notified, stabilization
    /// completes the rest of the ring and moves keys in.
    pub async fn join(&self, bootstrap: &str) -> Result<()> {
        if bootstrap == self.node().endpoint {
            return Err(Error::InvalidArgument(
                "cannot bootstrap from self".to_string(),
            ));
        }
        let bootstrap = NodeRef::new(bootstrap);
        let report = self
            .client
            .find_successor(&bootstrap, self.did(), 0)
            .await?;
        if report.node.did == self.did() {
            return Err(Error::InvalidArgument(format!(
                "identifier {} is already used by {}",
                self.did(),
                report.node
            )));
        }
        tracing::info!(
            "{} joins through {}, successor {}",
            self.node(),
            bootstrap,
            report.node
        );
        let act = self.dht.join(report.node)?;
        self.handle_dht_action(act).await
    }

    /// Carry out an action the ring view could not finish locally.
    pub(crate) async fn handle_dht_action(&self, act: PeerRingAction) -> Result<()> {
        match act {
            PeerRingAction::None => Ok(()),
            PeerRingAction::RemoteAction(next, PeerRingRemoteAction::Notify(node)) => {
                tracing::debug!("notify {} with {}", next, node);
                match self.client.notify(&next, node).await {
                    Ok(_) => Ok(()),
                    Err(e) if e.is_unreachable() => {
                        tracing::warn!("successor {} is unreachable on notify", next);
                        self.on_successor_failure(&next).await
                    }
                    Err(e) => Err(e),
                }
            }
            PeerRingAction::RemoteAction(next, PeerRingRemoteAction::FindSuccessorForFix(did)) => {
                match self.client.find_successor(&next, did, 1).await {
                    Ok(report) => self.dht.set_fix_finger(report.node),
                    Err(e) if e.is_unreachable() => {
                        tracing::debug!("finger {} is unreachable", next);
                        self.dht.remove_finger(next.did)
                    }
                    Err(e) => Err(e),
                }
            }
            act => Err(Error::PeerRingUnexpectedAction(act)),
        }
    }

    pub(crate) fn record_lookup(&self, hops: u32) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.lookup_hops.fetch_add(hops as u64, Ordering::Relaxed);
    }

    /// Snapshot of the ring view and store of self.
    pub async fn stats(&self) -> Result<NodeStats> {
        let (primary_keys, replica_keys) = self.store.counts().await?;
        Ok(NodeStats {
            node: self.node().clone(),
            dht: DHTInspect::inspect(&self.dht),
            primary_keys,
            replica_keys,
            replication_factor: self.replication_factor,
            lookups: self.lookups.load(Ordering::Relaxed),
            lookup_hops: self.lookup_hops.load(Ordering::Relaxed),
            started_at: self.started_at,
        })
    }
}
