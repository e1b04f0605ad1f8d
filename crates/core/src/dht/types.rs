//! DHT traits about `PeerRing`.
#![warn(missing_docs)]

use super::chord::TopoInfo;
use super::did::Did;
use super::NodeRef;
use crate::error::Result;

/// Chord is a distributed hash table (DHT) algorithm that is designed to efficiently
/// distribute data across peer-to-peer network nodes. You may want to browse its
/// [wiki](https://en.wikipedia.org/wiki/Chord_(peer-to-peer)) before you read this.
///
/// Every key of the store is hashed onto the same ring as the nodes, and the node
/// responsible for a key is the first node clockwise from it. `find_successor` answers
/// "who owns this id" and takes O(log n) hops with a correct finger table.
///
/// Some methods return an `Action` which is used to tell outer the extra action to take
/// after handling data inside the struct. It's useful since the struct only holds the
/// local view of the ring and cannot talk to other nodes by itself.
pub trait Chord<Action> {
    /// Learn about a node: place it in the finger table and successor sequence.
    fn join(&self, node: NodeRef) -> Result<Action>;

    /// Ask DHT for the successor of Did.
    /// May return a remote action for the successor is recorded in another node.
    fn find_successor(&self, did: Did) -> Result<Action>;

    /// Notify the DHT that a node may be its predecessor.
    /// Returns `true` if the node was adopted as the new predecessor.
    fn notify(&self, node: NodeRef) -> Result<bool>;

    /// Fix finger table by finding the successor for each finger.
    /// According to the paper, this method should be called periodically.
    /// According to the paper, only one finger should be fixed at a time.
    fn fix_fingers(&self) -> Result<Action>;
}

/// Stabilization of the successor list, in the style of Zave's correct chord:
/// the node refreshes its whole successor list from its successor instead of a single pointer.
pub trait CorrectChord<Action>: Chord<Action> {
    /// Before stabilizing, the node should query its first successor for TopoInfo.
    fn pre_stabilize(&self) -> Result<Action>;

    /// Apply the successor's [TopoInfo] and tell the outer whom to notify.
    fn stabilize(&self, successor: &NodeRef, info: TopoInfo) -> Result<Action>;

    /// A function to provide topological information about the chord.
    fn topo_info(&self) -> Result<TopoInfo>;
}
