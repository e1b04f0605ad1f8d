//! Client reads and writes, and the owner side of them.

use crate::consts::MAX_KEY_LEN;
use crate::consts::MAX_VALUE_LEN;
use crate::dht::Did;
use crate::dht::NodeRef;
use crate::dht::SuccessorReader;
use crate::error::Error;
use crate::error::Result;
use crate::message::DeleteReport;
use crate::message::StoreReport;
use crate::storage::Entry;
use crate::storage::Role;
use crate::swarm::Swarm;

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidArgument("key is empty".to_string()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(Error::InvalidArgument(format!(
            "key is longer than {} bytes",
            MAX_KEY_LEN
        )));
    }
    Ok(())
}

fn validate_value(value: &[u8]) -> Result<()> {
    if value.len() > MAX_VALUE_LEN {
        return Err(Error::InvalidArgument(format!(
            "value is larger than {} bytes",
            MAX_VALUE_LEN
        )));
    }
    Ok(())
}

impl Swarm {
    /// Owner of `did`. The local range is trusted only while the predecessor is known,
    /// otherwise the owner is resolved by a lookup.
    async fn owner_of(&self, did: Did, hops: u32) -> Result<NodeRef> {
        if self.dht.owns(did)? {
            return Ok(self.node().clone());
        }
        Ok(self.lookup(did, hops).await?.node)
    }

    /// Write `key` at its owner, which replicates it to its successors.
    pub async fn put(&self, key: &str, value: Vec<u8>, hops: u32) -> Result<StoreReport> {
        validate_key(key)?;
        validate_value(&value)?;
        let did = Did::from_key(key);
        let owner = self.owner_of(did, hops).await?;
        if owner == *self.node() {
            let entry = self.store.put_primary(key, value).await?;
            tracing::debug!("put {} at {} version {}", key, did, entry.version);
            let replicas = self.replicate(&entry).await?;
            return Ok(StoreReport {
                owner,
                version: entry.version,
                replicas,
            });
        }
        if hops + 1 > self.max_hops {
            return Err(Error::RoutingExhausted { did, hops });
        }
        self.client.put(&owner, key, value, hops + 1).await
    }

    /// Install a primary entry coming from another node at the owner of its key.
    pub async fn store_key(&self, entry: Entry, hops: u32) -> Result<StoreReport> {
        validate_key(&entry.key)?;
        let owner = self.owner_of(entry.did, hops).await?;
        if owner == *self.node() {
            let entry = entry.with_role(Role::Primary);
            self.store.install(entry.clone()).await?;
            // the stored version may be newer than the handed one
            let stored = self.store.get(entry.did).await?.unwrap_or(entry);
            let replicas = self.replicate(&stored).await?;
            return Ok(StoreReport {
                owner,
                version: stored.version,
                replicas,
            });
        }
        if hops + 1 > self.max_hops {
            return Err(Error::RoutingExhausted {
                did: entry.did,
                hops,
            });
        }
        self.client.store(&owner, entry, hops + 1).await
    }

    /// Read `key`, falling back to replica holders when the owner does not answer.
    ///
    /// `Ok(None)` means a reachable holder answered the key is absent. When no holder at all
    /// can be reached, the read fails with [Error::KeyUnavailable].
    pub async fn get(&self, key: &str) -> Result<Option<Entry>> {
        validate_key(key)?;
        let did = Did::from_key(key);

        let owner = match self.owner_of(did, 0).await {
            Ok(owner) => Some(owner),
            Err(e) => {
                tracing::warn!("failed to resolve owner of {}: {}", key, e);
                None
            }
        };

        if let Some(owner) = &owner {
            let fetched = if owner == self.node() {
                self.fetch_key(key, true).await
            } else {
                self.client.fetch(owner, key, true).await
            };
            match fetched {
                Ok(entry) => return Ok(entry),
                Err(e) if e.is_unreachable() => {
                    // only the routing hint goes, ring links stay
                    tracing::warn!("owner {} of {} is unreachable", owner, key);
                    self.dht.remove_finger(owner.did)?;
                }
                Err(e) => tracing::warn!("owner {} failed on {}: {}", owner, key, e),
            }
        }

        self.read_fallback(key, did, owner).await
    }

    /// Ask the replica holders of `key` in ring order, then the local successors.
    async fn read_fallback(&self, key: &str, did: Did, owner: Option<NodeRef>) -> Result<Option<Entry>> {
        if let Some(entry) = self.store.get(did).await? {
            tracing::debug!("{} served from local {:?} copy", key, entry.role);
            return Ok(Some(entry));
        }

        let mut tried: Vec<Did> = vec![self.did()];
        let mut answered = false;
        let mut cursor = did;
        if let Some(owner) = owner {
            tried.push(owner.did);
            cursor = owner.did;
        }

        let holders = self.replication_factor.saturating_sub(1);
        for _ in 0..holders {
            let holder = match self.lookup_excluding(cursor.next(), 0, tried.clone()).await {
                Ok(report) => report.node,
                Err(e) => {
                    tracing::debug!("no more holders of {}: {}", key, e);
                    break;
                }
            };
            cursor = holder.did;
            if tried.contains(&holder.did) {
                continue;
            }
            tried.push(holder.did);
            match self.client.fetch(&holder, key, false).await {
                Ok(Some(entry)) => return Ok(Some(entry)),
                Ok(None) => answered = true,
                Err(e) => tracing::debug!("holder {} failed on {}: {}", holder, key, e),
            }
        }

        for succ in self.dht.successors().list()? {
            if tried.contains(&succ.did) {
                continue;
            }
            tried.push(succ.did);
            match self.client.fetch(&succ, key, false).await {
                Ok(Some(entry)) => return Ok(Some(entry)),
                Ok(None) => answered = true,
                Err(e) => tracing::debug!("successor {} failed on {}: {}", succ, key, e),
            }
        }

        if answered {
            Ok(None)
        } else {
            Err(Error::KeyUnavailable(key.to_string()))
        }
    }

    /// Read the local copy of `key`.
    ///
    /// With `probe_successor`, a key owned here but missing is asked to the successor, which
    /// may still hold it while keys are migrating after a join. Without a known predecessor
    /// ownership cannot be checked and the successor is not asked.
    pub async fn fetch_key(&self, key: &str, probe_successor: bool) -> Result<Option<Entry>> {
        validate_key(key)?;
        let did = Did::from_key(key);
        if let Some(entry) = self.store.get(did).await? {
            return Ok(Some(entry));
        }
        if !probe_successor || !self.dht.owns(did)? {
            return Ok(None);
        }
        let succ = self.dht.successor()?;
        if succ == *self.node() {
            return Ok(None);
        }
        match self.client.fetch(&succ, key, false).await {
            Ok(entry) => Ok(entry),
            Err(e) => {
                tracing::debug!("probe of {} at successor {} failed: {}", key, succ, e);
                Ok(None)
            }
        }
    }

    /// Delete `key` at its owner, which drops the replicas on its successors.
    pub async fn delete(&self, key: &str, hops: u32) -> Result<DeleteReport> {
        validate_key(key)?;
        let did = Did::from_key(key);
        let owner = self.owner_of(did, hops).await?;
        if owner == *self.node() {
            let existed = self.store.remove(did).await?.is_some();
            let replicas = self.replicate_delete(key).await?;
            tracing::debug!("delete {} existed: {}, replicas: {}", key, existed, replicas);
            return Ok(DeleteReport { existed, replicas });
        }
        if hops + 1 > self.max_hops {
            return Err(Error::RoutingExhausted { did, hops });
        }
        self.client.delete(&owner, key, hops + 1).await
    }
}
