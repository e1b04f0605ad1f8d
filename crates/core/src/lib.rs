//! chordkv: a Chord ring with replicated key-value storage.
//! --------------
//! - [Chord](crate::dht::PeerRing) keeps the local view of the ring: predecessor, successor list
//!   and finger table over a 160-bit identifier space.
//! - [Swarm](crate::swarm::Swarm) is the node service: lookups, reads and writes, replication.
//! - [Stabilizer](crate::dht::Stabilizer) runs the periodic maintenance tasks.
//! - [Transport](crate::transport::Transport) carries requests between nodes, an in-process
//!   implementation is provided and other crates bring networked ones.
//!
//! # Keys and ownership
//!
//! A key is hashed with SHA-1 onto the ring. The node owning it is the first node clockwise
//! from the key identifier, that is the node whose range (predecessor, self] covers it.
//! The owner holds the PRIMARY copy and pushes REPLICA copies to its first r-1 successors,
//! r being the replication factor.
//!
//! # Failures
//!
//! When a node stops answering, its successor promotes the replicas of the dead range once it
//! adopts a new predecessor, and every owner refreshes its replicas on the remaining successors.
//! Reads go to replica holders while the ring heals.

pub mod consts;
pub mod dht;
pub mod error;
pub mod inspect;
pub mod message;
pub mod storage;
pub mod swarm;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod tests;
