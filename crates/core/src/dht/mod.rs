#![warn(missing_docs)]
//! Implementation of the chord ring,
//! which is based on CHORD, ref: <https://pdos.csail.mit.edu/papers/ton:chord/paper-ton.pdf>
//! With high probability, the number of nodes that must be contacted to find a successor in an N-node network is O(log N).

mod chord;
pub mod did;
/// Finger table of the ring
pub mod finger;
mod peer;
mod stabilization;
pub mod successor;
pub mod types;

pub use chord::PeerRing;
pub use chord::PeerRingAction;
pub use chord::RemoteAction as PeerRingRemoteAction;
pub use chord::TopoInfo;
pub use did::Did;
pub use finger::FingerTable;
pub use peer::NodeRef;
pub use stabilization::Stabilizer;
pub use stabilization::StabilizerIntervals;
pub use successor::SuccessorReader;
pub use successor::SuccessorWriter;
pub use types::Chord;
pub use types::CorrectChord;
