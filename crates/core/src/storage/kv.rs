//! Replicated key-value store of a node.
//!
//! Every entry is either the PRIMARY copy, held by the node whose range (predecessor, self]
//! covers the key, or a REPLICA copy pushed by one of the r-1 closest predecessors.

use serde::Deserialize;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::dht::Did;
use crate::error::Result;
use crate::storage::KvStorageInterface;
use crate::storage::MemStorage;
use crate::utils::get_epoch_ms;

/// Role of a stored copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Primary,
    Replica,
}

/// A stored key with its value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    pub did: Did,
    #[serde(with = "crate::utils::base64_bytes")]
    pub value: Vec<u8>,
    /// Bumped by every primary write, never decreases for a key.
    pub version: u64,
    pub role: Role,
}

impl Entry {
    pub fn new(key: &str, value: Vec<u8>, version: u64, role: Role) -> Self {
        Self {
            key: key.to_string(),
            did: Did::from_key(key),
            value,
            version,
            role,
        }
    }

    /// Same entry under another role.
    pub fn with_role(&self, role: Role) -> Self {
        Self {
            role,
            ..self.clone()
        }
    }
}

/// Backend accepted by [KeyValueStore].
pub type EntryStorage = Box<dyn KvStorageInterface<Entry> + Send + Sync>;

/// Entries keyed by key identifier.
/// Lookups go straight to the backend, read-modify-write operations are serialized
/// by a store-level writer lock.
pub struct KeyValueStore {
    storage: EntryStorage,
    writer: Mutex<()>,
}

impl Default for KeyValueStore {
    fn default() -> Self {
        Self::new(Box::new(MemStorage::new()))
    }
}

impl KeyValueStore {
    pub fn new(storage: EntryStorage) -> Self {
        Self {
            storage,
            writer: Mutex::new(()),
        }
    }

    pub async fn get(&self, did: Did) -> Result<Option<Entry>> {
        self.storage.get(&did.to_string()).await
    }

    /// Write `key` as PRIMARY with a version greater than any previous one.
    /// Versions follow a wall clock in ms, so a key deleted then written again still
    /// supersedes copies left behind by the older writes.
    pub async fn put_primary(&self, key: &str, value: Vec<u8>) -> Result<Entry> {
        let _guard = self.writer.lock().await;
        let did = Did::from_key(key);
        let last = self
            .storage
            .get(&did.to_string())
            .await?
            .map(|e| e.version)
            .unwrap_or(0);
        let entry = Entry::new(key, value, get_epoch_ms().max(last + 1), Role::Primary);
        self.storage.put(&did.to_string(), &entry).await?;
        Ok(entry)
    }

    /// Install an entry received from another node.
    /// Older versions are ignored, a replica never demotes a primary, and a primary copy
    /// of the same version upgrades a local replica. Returns whether anything changed.
    pub async fn install(&self, entry: Entry) -> Result<bool> {
        let _guard = self.writer.lock().await;
        let k = entry.did.to_string();
        let merged = match self.storage.get(&k).await? {
            None => entry,
            Some(cur) if cur.version > entry.version => return Ok(false),
            Some(cur) if cur.version == entry.version => {
                if cur.role == Role::Replica && entry.role == Role::Primary {
                    cur.with_role(Role::Primary)
                } else {
                    return Ok(false);
                }
            }
            Some(cur) if cur.role == Role::Primary => entry.with_role(Role::Primary),
            Some(_) => entry,
        };
        self.storage.put(&k, &merged).await?;
        Ok(true)
    }

    pub async fn remove(&self, did: Did) -> Result<Option<Entry>> {
        let _guard = self.writer.lock().await;
        self.storage.remove(&did.to_string()).await
    }

    pub async fn entries(&self) -> Result<Vec<Entry>> {
        Ok(self
            .storage
            .get_all()
            .await?
            .into_iter()
            .map(|(_, v)| v)
            .collect())
    }

    pub async fn entries_with_role(&self, role: Role) -> Result<Vec<Entry>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .filter(|e| e.role == role)
            .collect())
    }

    /// Change the role of every `from` entry whose id lies in (low, high] to `to`.
    /// Returns the changed entries under their new role.
    async fn switch_role_in(&self, from: Role, to: Role, low: Did, high: Did) -> Result<Vec<Entry>> {
        let _guard = self.writer.lock().await;
        let mut ret = vec![];
        for (k, e) in self.storage.get_all().await? {
            if e.role == from && e.did.in_range(low, high) {
                let switched = e.with_role(to);
                self.storage.put(&k, &switched).await?;
                ret.push(switched);
            }
        }
        Ok(ret)
    }

    /// Hand primaries in (low, high] over to another node: they are kept here as
    /// replicas and returned as primaries.
    pub async fn take_primaries_in(&self, low: Did, high: Did) -> Result<Vec<Entry>> {
        Ok(self
            .switch_role_in(Role::Primary, Role::Replica, low, high)
            .await?
            .into_iter()
            .map(|e| e.with_role(Role::Primary))
            .collect())
    }

    /// Promote replicas in (low, high] to primaries.
    pub async fn promote_in(&self, low: Did, high: Did) -> Result<Vec<Entry>> {
        self.switch_role_in(Role::Replica, Role::Primary, low, high)
            .await
    }

    /// Demote a single primary after handing it off.
    pub async fn demote(&self, entry: &Entry) -> Result<bool> {
        let _guard = self.writer.lock().await;
        let k = entry.did.to_string();
        match self.storage.get(&k).await? {
            Some(cur) if cur.role == Role::Primary && cur.version == entry.version => {
                self.storage.put(&k, &cur.with_role(Role::Replica)).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Counts of (primary, replica) entries.
    pub async fn counts(&self) -> Result<(u32, u32)> {
        let entries = self.entries().await?;
        let primary = entries.iter().filter(|e| e.role == Role::Primary).count() as u32;
        Ok((primary, entries.len() as u32 - primary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_primary_bumps_version() -> Result<()> {
        let store = KeyValueStore::default();
        let e1 = store.put_primary("apple", b"red".to_vec()).await?;
        let e2 = store.put_primary("apple", b"green".to_vec()).await?;
        assert!(e2.version > e1.version);
        assert_eq!(e2.role, Role::Primary);

        let got = store.get(Did::from_key("apple")).await?.unwrap();
        assert_eq!(got.value, b"green".to_vec());
        assert_eq!(store.counts().await?, (1, 0));
        Ok(())
    }

    #[tokio::test]
    async fn test_install_replica_is_idempotent() -> Result<()> {
        let store = KeyValueStore::default();
        let entry = Entry::new("apple", b"red".to_vec(), 3, Role::Replica);

        assert!(store.install(entry.clone()).await?);
        let before = store.entries().await?;
        assert!(!store.install(entry.clone()).await?);
        assert!(!store.install(entry).await?);
        assert_eq!(store.entries().await?, before);
        assert_eq!(store.counts().await?, (0, 1));
        Ok(())
    }

    #[tokio::test]
    async fn test_install_keeps_newest_and_primary() -> Result<()> {
        let store = KeyValueStore::default();
        let did = Did::from_key("apple");

        store
            .install(Entry::new("apple", b"v5".to_vec(), 5, Role::Replica))
            .await?;
        // stale
        assert!(
            !store
                .install(Entry::new("apple", b"v4".to_vec(), 4, Role::Replica))
                .await?
        );
        // same version primary upgrades the role
        assert!(
            store
                .install(Entry::new("apple", b"v5".to_vec(), 5, Role::Primary))
                .await?
        );
        assert_eq!(store.get(did).await?.unwrap().role, Role::Primary);
        // newer replica updates the value but keeps the primary role
        assert!(
            store
                .install(Entry::new("apple", b"v6".to_vec(), 6, Role::Replica))
                .await?
        );
        let got = store.get(did).await?.unwrap();
        assert_eq!((got.value.as_slice(), got.version, got.role), (&b"v6"[..], 6, Role::Primary));
        Ok(())
    }

    #[tokio::test]
    async fn test_take_and_promote_ranges() -> Result<()> {
        let store = KeyValueStore::default();
        let keys = ["a", "b", "c", "d", "e", "f"];
        for k in keys {
            store.put_primary(k, k.as_bytes().to_vec()).await?;
        }
        let mut dids: Vec<Did> = keys.iter().map(|k| Did::from_key(k)).collect();
        dids.sort();

        // (dids[0], dids[2]] holds exactly dids[1] and dids[2]
        let taken = store.take_primaries_in(dids[0], dids[2]).await?;
        assert_eq!(taken.len(), 2);
        assert!(taken.iter().all(|e| e.role == Role::Primary));
        assert_eq!(store.counts().await?, (4, 2));

        let promoted = store.promote_in(dids[0], dids[2]).await?;
        assert_eq!(promoted.len(), 2);
        assert_eq!(store.counts().await?, (6, 0));

        let e = store.get(dids[3]).await?.unwrap();
        assert!(store.demote(&e).await?);
        assert!(!store.demote(&e).await?);
        assert_eq!(store.counts().await?, (5, 1));

        assert!(store.remove(dids[3]).await?.is_some());
        assert_eq!(store.counts().await?, (5, 0));
        Ok(())
    }
}
