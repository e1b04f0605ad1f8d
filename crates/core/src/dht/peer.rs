//! Reference to a ring member.

use std::borrow::Borrow;
use std::hash::Hash;
use std::hash::Hasher;

use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;

/// A ring member: its identifier plus the endpoint it can be reached at.
/// Two references are equal when their dids are equal, whatever the endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeRef {
    /// Position on the ring.
    pub did: Did,
    /// Address the node answers remote calls on.
    pub endpoint: String,
}

impl NodeRef {
    /// Reference a node by endpoint, its did is the hash of the endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            did: Did::hash(endpoint.as_bytes()),
            endpoint,
        }
    }

    /// Reference with an explicit did.
    pub fn with_did(did: Did, endpoint: impl Into<String>) -> Self {
        Self {
            did,
            endpoint: endpoint.into(),
        }
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.did == other.did
    }
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.did.hash(state)
    }
}

impl Borrow<Did> for NodeRef {
    fn borrow(&self) -> &Did {
        &self.did
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}@{}", self.did, self.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ref_eq_by_did() {
        let a = NodeRef::new("127.0.0.1:7000");
        let b = NodeRef::with_did(a.did, "10.0.0.1:7000");
        let c = NodeRef::new("127.0.0.1:7001");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.did, Did::hash("127.0.0.1:7000"));
    }
}
