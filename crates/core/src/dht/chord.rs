//! Chord algorithm implement.
#![warn(missing_docs)]
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Deserialize;
use serde::Serialize;

use super::did::closest_preceding;
use super::did::BiasId;
use super::successor::SuccessorSeq;
use super::types::Chord;
use super::types::CorrectChord;
use super::FingerTable;
use crate::consts::ID_BITS;
use crate::dht::Did;
use crate::dht::NodeRef;
use crate::dht::SuccessorReader;
use crate::dht::SuccessorWriter;
use crate::error::Error;
use crate::error::Result;

/// PeerRing is a node's view of the ring: predecessor, successor sequence and finger table.
/// All nodes form a clockwise ring in the order of Did.
/// PeerRing implemented [Chord] algorithm.
pub struct PeerRing {
    /// The did of current node.
    pub did: Did,
    /// Reference of current node, handed to other nodes in notify.
    pub node: NodeRef,
    /// [FingerTable] help node to find successor quickly.
    pub finger: Arc<Mutex<FingerTable>>,
    /// The next nodes on the ring.
    /// The [SuccessorSeq] holds up to r nodes for fault tolerance and replica placement.
    pub successor_seq: SuccessorSeq,
    /// The previous node on the ring.
    pub predecessor: Arc<Mutex<Option<NodeRef>>>,
}

/// Type alias is just for making the code easy to read.
type Target = NodeRef;

/// `PeerRing` use this to describe the result of [Chord] algorithm. Sometimes it's a
/// direct result, sometimes it's an action that is continued externally.
#[derive(Clone, Debug, PartialEq)]
pub enum PeerRingAction {
    /// No result, the whole manipulation is done internally.
    None,
    /// Found some node.
    Some(NodeRef),
    /// Trigger a remote action.
    RemoteAction(Target, RemoteAction),
}

/// Some of the process needs to be done remotely. This enum is used to describe that.
///
/// To avoid ambiguity, in the following comments, `node_a` is the target declared in
/// [PeerRingAction]. Other values are the fields declared in this [RemoteAction].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteAction {
    /// Need `node_a` to find `did_b`.
    FindSuccessor(Did),
    /// Need `node_a` to find `did_b` then set it at the current fix index of finger table.
    FindSuccessorForFix(Did),
    /// Let `node_a` [notify](Chord::notify) `node_b`.
    Notify(NodeRef),
    /// Fetch successor list and predecessor from `node_a`.
    QueryForTopoInfo,
}

/// Information about successor and predecessor
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize, Clone)]
pub struct TopoInfo {
    /// Successor list
    pub successors: Vec<NodeRef>,
    /// Predecessor
    pub predecessor: Option<NodeRef>,
}

impl TryFrom<&PeerRing> for TopoInfo {
    type Error = Error;
    fn try_from(dht: &PeerRing) -> Result<TopoInfo> {
        let successors = dht.successors().list()?;
        let predecessor = dht.lock_predecessor()?.clone();
        Ok(TopoInfo {
            successors,
            predecessor,
        })
    }
}

impl PeerRingAction {
    /// Returns `true` if the action is a [PeerRingAction::None] value.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns `true` if the action is a [PeerRingAction::RemoteAction] value.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteAction(..))
    }
}

impl PeerRing {
    /// Create the ring view of `node`, with `succ_max` successors at most.
    pub fn new(node: NodeRef, succ_max: u8) -> Self {
        let did = node.did;
        Self {
            successor_seq: SuccessorSeq::new(did, succ_max),
            predecessor: Arc::new(Mutex::new(None)),
            finger: Arc::new(Mutex::new(FingerTable::new(did, ID_BITS))),
            node,
            did,
        }
    }

    /// Become the sole member of a new ring: successor and predecessor are self.
    pub fn create(&self) -> Result<()> {
        self.successors().replace(vec![])?;
        *self.lock_predecessor()? = Some(self.node.clone());
        Ok(())
    }

    /// Return successor sequence
    pub fn successors(&self) -> SuccessorSeq {
        self.successor_seq.clone()
    }

    /// Immediate successor, self when the sequence is empty.
    pub fn successor(&self) -> Result<NodeRef> {
        Ok(self
            .successors()
            .min()?
            .unwrap_or_else(|| self.node.clone()))
    }

    /// Current predecessor.
    pub fn predecessor(&self) -> Result<Option<NodeRef>> {
        Ok(self.lock_predecessor()?.clone())
    }

    /// Lock and return MutexGuard of finger table.
    pub fn lock_finger(&self) -> Result<MutexGuard<'_, FingerTable>> {
        self.finger.lock().map_err(|_| Error::DHTSyncLockError)
    }

    /// Lock and return MutexGuard of predecessor.
    pub fn lock_predecessor(&self) -> Result<MutexGuard<'_, Option<NodeRef>>> {
        self.predecessor.lock().map_err(|_| Error::DHTSyncLockError)
    }

    /// Remove a node from finger table.
    /// Also remove it from successor sequence and predecessor.
    /// If successor_seq become empty, try setting the closest node to it.
    pub fn remove(&self, did: Did) -> Result<()> {
        let mut finger = self.lock_finger()?;
        let successor = self.successors();
        let mut predecessor = self.lock_predecessor()?;
        if predecessor.as_ref().map(|p| p.did) == Some(did) {
            *predecessor = None;
        }
        finger.remove(did);
        successor.remove(did)?;
        if successor.is_empty()? {
            if let Some(x) = finger.first() {
                successor.update(x)?;
            }
        }
        Ok(())
    }

    /// Drop a stale routing hint, the successor sequence is left untouched.
    pub fn remove_finger(&self, did: Did) -> Result<()> {
        self.lock_finger()?.remove(did);
        Ok(())
    }

    /// Set the finger entry under the current fix index.
    pub fn set_fix_finger(&self, node: NodeRef) -> Result<()> {
        self.lock_finger()?.set_fix(node);
        Ok(())
    }

    /// Whether `did` is known to fall in this node's primary range (predecessor, self].
    /// Without a predecessor the range is unknown and nothing is claimed, the owner has to
    /// be resolved by a lookup.
    pub fn owns(&self, did: Did) -> Result<bool> {
        Ok(match &*self.lock_predecessor()? {
            Some(pre) => did.in_range(pre.did, self.did),
            None => false,
        })
    }

    /// Route one step towards the successor of `did`, never choosing a node in `exclude`.
    pub fn route(&self, did: Did, exclude: &[Did]) -> Result<PeerRingAction> {
        let successors: Vec<NodeRef> = self
            .successors()
            .list()?
            .into_iter()
            .filter(|n| !exclude.contains(&n.did))
            .collect();
        let finger = self.lock_finger()?;

        if let Some(succ) = successors.first() {
            if did.in_range(self.did, succ.did) {
                return Ok(PeerRingAction::Some(succ.clone()));
            }
        }

        let candidates = finger
            .list()
            .iter()
            .flatten()
            .filter(|n| !exclude.contains(&n.did))
            .chain(successors.iter())
            .cloned();

        let ret = match closest_preceding(self.did, did, candidates) {
            Some(next) => PeerRingAction::RemoteAction(next, RemoteAction::FindSuccessor(did)),
            None => PeerRingAction::Some(
                successors
                    .first()
                    .cloned()
                    .unwrap_or_else(|| self.node.clone()),
            ),
        };

        tracing::debug!(
            "find_successor: self: {}, did: {}, successors: {:?}, result: {:?}",
            self.did,
            did,
            successors,
            ret
        );
        Ok(ret)
    }

    /// Calculate bias of the Did on the ring.
    pub fn bias(&self, did: Did) -> BiasId {
        BiasId::new(self.did, did)
    }
}

impl Chord<PeerRingAction> for PeerRing {
    /// Learn about `node`, usually the successor found through a bootstrap node.
    /// Returns a [RemoteAction::Notify] so the caller announces itself to that node.
    fn join(&self, node: NodeRef) -> Result<PeerRingAction> {
        if node == self.node {
            return Ok(PeerRingAction::None);
        }

        let mut finger = self.lock_finger()?;
        finger.join(node.clone());
        // Always try update
        self.successors().update(node.clone())?;
        Ok(PeerRingAction::RemoteAction(
            node,
            RemoteAction::Notify(self.node.clone()),
        ))
    }

    /// Find the successor of a Did.
    /// May return a remote action for the successor is recorded in another node.
    fn find_successor(&self, did: Did) -> Result<PeerRingAction> {
        self.route(did, &[])
    }

    /// Handle notification from a node that thinks it is the predecessor of current node.
    /// Adopt it if there is no predecessor or it lies strictly between the predecessor and self.
    fn notify(&self, node: NodeRef) -> Result<bool> {
        if node == self.node {
            return Ok(false);
        }

        let adopted = {
            let mut predecessor = self.lock_predecessor()?;
            let adopt = match &*predecessor {
                Some(pre) => node.did.between(pre.did, self.did),
                None => true,
            };
            if adopt {
                *predecessor = Some(node.clone());
            }
            adopt
        };

        if adopted {
            self.lock_finger()?.join(node);
        }
        Ok(adopted)
    }

    /// Fix finger table by finding the successor for each finger.
    /// According to the paper, this method should be called periodically.
    /// According to the paper, only one finger should be fixed at a time.
    fn fix_fingers(&self) -> Result<PeerRingAction> {
        // Caution here that there are also locks in find_successor.
        // The finger guard is dropped before calling it.
        let (_, start) = self.lock_finger()?.next_fix();

        match self.find_successor(start)? {
            PeerRingAction::Some(node) => {
                self.set_fix_finger(node)?;
                Ok(PeerRingAction::None)
            }
            PeerRingAction::RemoteAction(next, RemoteAction::FindSuccessor(did)) => Ok(
                PeerRingAction::RemoteAction(next, RemoteAction::FindSuccessorForFix(did)),
            ),
            act => {
                tracing::error!("Invalid PeerRing Action");
                Err(Error::PeerRingUnexpectedAction(act))
            }
        }
    }
}

impl CorrectChord<PeerRingAction> for PeerRing {
    fn pre_stabilize(&self) -> Result<PeerRingAction> {
        Ok(PeerRingAction::RemoteAction(
            self.successor()?,
            RemoteAction::QueryForTopoInfo,
        ))
    }

    /// Adopt the successor's predecessor when it sits between self and the successor,
    /// rebuild the successor sequence from the successor's list, then notify the head.
    fn stabilize(&self, successor: &NodeRef, info: TopoInfo) -> Result<PeerRingAction> {
        let mut head = successor.clone();
        if let Some(x) = info.predecessor {
            if x.did.between(self.did, successor.did) {
                head = x;
            }
        }

        let mut list = vec![head.clone()];
        if head != *successor {
            list.push(successor.clone());
        }
        list.extend(info.successors);
        self.successors().replace(list)?;

        if head == self.node {
            return Ok(PeerRingAction::None);
        }
        if head != *successor {
            self.lock_finger()?.join(head.clone());
        }
        Ok(PeerRingAction::RemoteAction(
            head,
            RemoteAction::Notify(self.node.clone()),
        ))
    }

    fn topo_info(&self) -> Result<TopoInfo> {
        self.try_into()
    }
}
