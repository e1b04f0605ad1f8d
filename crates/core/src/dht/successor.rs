//! Successor list of a ring member.
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;

use crate::dht::did::BiasId;
use crate::dht::Did;
use crate::dht::NodeRef;
use crate::error::Error;
use crate::error::Result;

/// A sequence of successors for a node on the ring.
/// Multiple successors let the node fail over when its immediate successor departs, and hold
/// the replicas of its primary keys.
/// The successors are kept in order of clockwise distance from the node and never contain it.
/// See also [super::did::BiasId].
#[derive(Debug, Clone)]
pub struct SuccessorSeq {
    /// Node did
    did: Did,
    /// Max successor num
    max: u8,
    /// Successors
    successors: Arc<RwLock<Vec<NodeRef>>>,
}

/// Read access to a [SuccessorSeq].
pub trait SuccessorReader {
    /// No successor is known.
    fn is_empty(&self) -> Result<bool>;
    /// The sequence holds its maximum number of successors.
    fn is_full(&self) -> Result<bool>;
    /// Successor at `index`, 0 being the immediate one.
    fn get(&self, index: usize) -> Result<Option<NodeRef>>;
    /// Number of known successors.
    fn len(&self) -> Result<usize>;
    /// The immediate successor.
    fn min(&self) -> Result<Option<NodeRef>>;
    /// The farthest known successor.
    fn max(&self) -> Result<Option<NodeRef>>;
    /// Successors in clockwise order.
    fn list(&self) -> Result<Vec<NodeRef>>;
    /// Whether `did` is one of the successors.
    fn contains(&self, did: &Did) -> Result<bool>;
}

/// Write access to a [SuccessorSeq].
pub trait SuccessorWriter {
    /// Insert `successor` in clockwise order, returns it when it was kept.
    fn update(&self, successor: NodeRef) -> Result<Option<NodeRef>>;
    /// Replace the whole sequence.
    fn replace(&self, succ_list: Vec<NodeRef>) -> Result<()>;
    /// Drop `did` from the sequence.
    fn remove(&self, did: Did) -> Result<()>;
}

impl SuccessorSeq {
    /// Empty sequence of node `did`, holding `max` successors at most.
    pub fn new(did: Did, max: u8) -> Self {
        Self {
            did,
            max,
            successors: Arc::new(RwLock::new(vec![])),
        }
    }

    /// Read guard over the successors.
    pub fn successors(&self) -> Result<RwLockReadGuard<'_, Vec<NodeRef>>> {
        self.successors
            .read()
            .map_err(|_| Error::FailedToReadSuccessors)
    }

    /// Calculate bias of the Did on the ring.
    pub fn bias(&self, did: Did) -> BiasId {
        BiasId::new(self.did, did)
    }
}

impl SuccessorReader for SuccessorSeq {
    fn contains(&self, did: &Did) -> Result<bool> {
        let succs = self.successors()?;
        Ok(succs.iter().any(|n| &n.did == did))
    }

    fn is_empty(&self) -> Result<bool> {
        let succs = self.successors()?;
        Ok(succs.is_empty())
    }

    fn is_full(&self) -> Result<bool> {
        let succs = self.successors()?;
        Ok(succs.len() as u8 >= self.max)
    }

    fn get(&self, index: usize) -> Result<Option<NodeRef>> {
        let succs = self.successors()?;
        Ok(succs.get(index).cloned())
    }

    fn len(&self) -> Result<usize> {
        let succs = self.successors()?;
        Ok(succs.len())
    }

    fn min(&self) -> Result<Option<NodeRef>> {
        let succs = self.successors()?;
        Ok(succs.first().cloned())
    }

    fn max(&self) -> Result<Option<NodeRef>> {
        let succs = self.successors()?;
        Ok(succs.last().cloned())
    }

    fn list(&self) -> Result<Vec<NodeRef>> {
        let succs = self.successors()?;
        Ok(succs.clone())
    }
}

impl SuccessorWriter for SuccessorSeq {
    fn update(&self, successor: NodeRef) -> Result<Option<NodeRef>> {
        // if successor in successor list
        // or successor is self
        // or list is full and successor is farther than successor.max()
        if (self.contains(&successor.did)?) || (successor.did == self.did) {
            return Ok(None);
        }

        if let Some(max) = self.max()? {
            if self.bias(successor.did) >= self.bias(max.did) && self.is_full()? {
                return Ok(None);
            }
        }

        let mut succs = self
            .successors
            .write()
            .map_err(|_| Error::FailedToWriteSuccessors)?;

        succs.push(successor.clone());
        succs.sort_by_key(|n| self.bias(n.did));
        succs.truncate(self.max.into());
        if succs.contains(&successor) {
            Ok(Some(successor))
        } else {
            Ok(None)
        }
    }

    /// Replace the whole sequence, dropping self and duplicates.
    fn replace(&self, succ_list: Vec<NodeRef>) -> Result<()> {
        let mut list: Vec<NodeRef> = vec![];
        for n in succ_list {
            if n.did != self.did && !list.contains(&n) {
                list.push(n);
            }
        }
        list.sort_by_key(|n| self.bias(n.did));
        list.truncate(self.max.into());

        let mut succs = self
            .successors
            .write()
            .map_err(|_| Error::FailedToWriteSuccessors)?;
        *succs = list;
        Ok(())
    }

    fn remove(&self, did: Did) -> Result<()> {
        let mut succs = self
            .successors
            .write()
            .map_err(|_| Error::FailedToWriteSuccessors)?;
        succs.retain(|v| v.did != did);
        Ok(())
    }
}
