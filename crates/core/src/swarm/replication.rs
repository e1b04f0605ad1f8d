//! Replica placement and recovery.
//!
//! The primary copy of a key lives at its owner, replicas on the first r-1 successors of
//! the owner. Replicas are installed by version, so pushing the same entry again is a no-op.

use std::sync::Arc;

use crate::dht::Did;
use crate::dht::NodeRef;
use crate::dht::SuccessorReader;
use crate::error::Result;
use crate::storage::Entry;
use crate::storage::Role;
use crate::swarm::Swarm;

impl Swarm {
    /// Push `entry` to the first r-1 reachable successors, returns the acknowledged pushes.
    /// A successor that cannot be reached is dropped from the ring view and the next one
    /// is used instead.
    pub async fn replicate(&self, entry: &Entry) -> Result<u32> {
        let want = self.replication_factor.saturating_sub(1) as u32;
        let replica = entry.with_role(Role::Replica);
        let mut acked = 0;
        for succ in self.dht.successors().list()? {
            if acked >= want {
                break;
            }
            match self.client.replicate_push(&succ, replica.clone()).await {
                Ok(_) => acked += 1,
                Err(e) if e.is_unreachable() => {
                    tracing::warn!("replica target {} is unreachable", succ);
                    self.dht.remove(succ.did)?;
                }
                Err(e) => tracing::warn!("replica push to {} failed: {}", succ, e),
            }
        }
        if acked < want {
            tracing::debug!(
                "{} replicated to {} of {} successors",
                entry.key,
                acked,
                want
            );
        }
        Ok(acked)
    }

    /// Drop the replicas of `key` on the first r-1 reachable successors.
    pub(crate) async fn replicate_delete(&self, key: &str) -> Result<u32> {
        let want = self.replication_factor.saturating_sub(1) as u32;
        let mut acked = 0;
        for succ in self.dht.successors().list()? {
            if acked >= want {
                break;
            }
            match self.client.replicate_delete(&succ, key).await {
                Ok(_) => acked += 1,
                Err(e) => tracing::warn!("replica delete at {} failed: {}", succ, e),
            }
        }
        Ok(acked)
    }

    /// Install a replica pushed by a primary, returns whether the local store changed.
    pub async fn accept_replica(&self, entry: Entry) -> Result<bool> {
        self.store.install(entry.with_role(Role::Replica)).await
    }

    /// Drop the local replica of `key`, a primary copy is left alone.
    pub async fn drop_replica(&self, key: &str) -> Result<bool> {
        let did = Did::from_key(key);
        match self.store.get(did).await? {
            Some(e) if e.role == Role::Replica => Ok(self.store.remove(did).await?.is_some()),
            _ => Ok(false),
        }
    }

    /// Hand the primaries in (start, end] over to the node asking for them.
    /// Nothing is handed over while `end` still falls in the local range, or while the
    /// local range is unknown.
    pub async fn transfer_keys(&self, start: Did, end: Did) -> Result<Vec<Entry>> {
        if self.dht.predecessor()?.is_none() || self.dht.owns(end)? {
            tracing::debug!("refuse transfer of ({}, {}], still owned here", start, end);
            return Ok(vec![]);
        }
        let entries = self.store.take_primaries_in(start, end).await?;
        tracing::info!(
            "hand over {} keys in ({}, {}]",
            entries.len(),
            start,
            end
        );
        Ok(entries)
    }

    /// Promote the replicas that fell into the local range to primaries, then push them on.
    pub async fn promote(&self) -> Result<usize> {
        let pre = match self.dht.predecessor()? {
            Some(pre) => pre,
            None => return Ok(0),
        };
        let promoted = self.store.promote_in(pre.did, self.did()).await?;
        if !promoted.is_empty() {
            tracing::info!("{} promoted {} replicas", self.node(), promoted.len());
        }
        for entry in promoted.iter() {
            self.replicate(entry).await?;
        }
        Ok(promoted.len())
    }

    /// Take over the keys of (predecessor, self] still held as primaries by the successor.
    pub async fn pull_from_successor(&self) -> Result<usize> {
        let pre = match self.dht.predecessor()? {
            Some(pre) if pre != *self.node() => pre,
            _ => return Ok(0),
        };
        let succ = self.dht.successor()?;
        if succ == *self.node() || succ == pre {
            return Ok(0);
        }
        let entries = self.client.transfer_keys(&succ, pre.did, self.did()).await?;
        let mut moved = 0;
        for entry in entries {
            if self.store.install(entry.with_role(Role::Primary)).await? {
                moved += 1;
            }
        }
        if moved > 0 {
            tracing::info!("{} took over {} keys from {}", self.node(), moved, succ);
        }
        Ok(moved)
    }

    /// Move the primaries outside the local range to their owners, keeping them as replicas.
    pub async fn hand_off(&self) -> Result<usize> {
        let mut moved = 0;
        for entry in self.store.entries_with_role(Role::Primary).await? {
            if self.dht.owns(entry.did)? {
                continue;
            }
            let owner = match self.lookup(entry.did, 0).await {
                Ok(report) => report.node,
                Err(e) => {
                    tracing::warn!("failed to resolve owner of {}: {}", entry.key, e);
                    continue;
                }
            };
            if owner == *self.node() {
                continue;
            }
            match self.client.store(&owner, entry.clone(), 0).await {
                Ok(_) => {
                    self.store.demote(&entry).await?;
                    moved += 1;
                }
                Err(e) => tracing::warn!("hand off {} to {} failed: {}", entry.key, owner, e),
            }
        }
        Ok(moved)
    }

    /// Push every primary to the current replica set.
    pub async fn rereplicate(&self) -> Result<usize> {
        let primaries = self.store.entries_with_role(Role::Primary).await?;
        for entry in primaries.iter() {
            self.replicate(entry).await?;
        }
        Ok(primaries.len())
    }

    /// Bring the local store in line with the current ring view: promotion, migration and
    /// re-replication. Every step is idempotent.
    pub async fn sweep(&self) -> Result<()> {
        self.promote().await?;
        if let Err(e) = self.pull_from_successor().await {
            tracing::warn!("pull from successor failed: {}", e);
        }
        self.hand_off().await?;
        self.rereplicate().await?;
        Ok(())
    }

    /// A new predecessor was adopted.
    pub(crate) fn on_predecessor_changed(self: &Arc<Self>, pre: NodeRef) {
        tracing::debug!("{} adopted predecessor {}", self.node(), pre);
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.sweep().await {
                tracing::warn!("sweep after predecessor change failed: {}", e);
            }
        });
    }

    /// The successor stopped answering: drop it and restore the replica count of every
    /// primary on the remaining successors.
    pub async fn on_successor_failure(&self, succ: &NodeRef) -> Result<()> {
        tracing::warn!("{} lost successor {}", self.node(), succ);
        self.dht.remove(succ.did)?;
        self.promote().await?;
        self.rereplicate().await?;
        Ok(())
    }
}
