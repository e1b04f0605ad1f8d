#![warn(missing_docs)]
//! This module provider [SwarmBuilder] and it's interface for
//! [Swarm]

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::consts::DEFAULT_MAX_HOPS;
use crate::consts::DEFAULT_REPLICATION_FACTOR;
use crate::consts::DEFAULT_RPC_TIMEOUT_MS;
use crate::consts::MAX_ROUTE_ATTEMPTS;
use crate::dht::NodeRef;
use crate::dht::PeerRing;
use crate::error::Error;
use crate::error::Result;
use crate::storage::EntryStorage;
use crate::storage::KeyValueStore;
use crate::swarm::Swarm;
use crate::transport::PeerClient;
use crate::transport::Transport;

/// Creates a SwarmBuilder to configure a Swarm.
pub struct SwarmBuilder {
    endpoint: String,
    transport: Arc<dyn Transport>,
    replication_factor: u8,
    max_hops: u32,
    rpc_timeout: Duration,
    storage: Option<EntryStorage>,
}

impl SwarmBuilder {
    /// Creates new instance of [SwarmBuilder] for a node reachable at `endpoint`.
    pub fn new(endpoint: &str, transport: Arc<dyn Transport>) -> Self {
        SwarmBuilder {
            endpoint: endpoint.to_string(),
            transport,
            replication_factor: DEFAULT_REPLICATION_FACTOR,
            max_hops: DEFAULT_MAX_HOPS,
            rpc_timeout: Duration::from_millis(DEFAULT_RPC_TIMEOUT_MS),
            storage: None,
        }
    }

    /// Sets up the replication factor, which is also the length of the successor list.
    pub fn replication_factor(mut self, r: u8) -> Self {
        self.replication_factor = r;
        self
    }

    /// Sets up the hop limit of lookups.
    pub fn max_hops(mut self, hops: u32) -> Self {
        self.max_hops = hops;
        self
    }

    /// Sets up the timeout of a single remote call. Calls answered after further remote calls
    /// get a multiple of it.
    pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// Use another backend than memory for the local store.
    pub fn storage(mut self, storage: EntryStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Try build for `Swarm`.
    pub fn build(self) -> Result<Swarm> {
        if self.replication_factor == 0 {
            return Err(Error::InvalidArgument(
                "replication factor must be at least 1".to_string(),
            ));
        }
        if self.endpoint.is_empty() {
            return Err(Error::InvalidArgument("endpoint is empty".to_string()));
        }

        let node = NodeRef::new(self.endpoint);
        let dht = Arc::new(PeerRing::new(node, self.replication_factor));
        let store = Arc::new(match self.storage {
            Some(storage) => KeyValueStore::new(storage),
            None => KeyValueStore::default(),
        });

        // a forwarded write may resolve its owner, then push to every successor
        let nested_calls = MAX_ROUTE_ATTEMPTS as u32 + self.replication_factor as u32 + 1;
        let client = PeerClient::new(self.transport, self.rpc_timeout)
            .forward_timeout(self.rpc_timeout * nested_calls);

        Ok(Swarm {
            dht,
            store,
            client,
            replication_factor: self.replication_factor,
            max_hops: self.max_hops,
            started_at: Utc::now(),
            lookups: AtomicU64::new(0),
            lookup_hops: AtomicU64::new(0),
        })
    }
}
