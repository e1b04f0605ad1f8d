#![warn(missing_docs)]
use derivative::Derivative;
use num_bigint::BigUint;
use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;
use crate::dht::NodeRef;

/// Finger table of Chord DHT.
/// Entry k caches successor(did + 2^k). Entries are routing hints only.
#[derive(Derivative, Clone, Debug, Serialize, Deserialize)]
#[derivative(PartialEq)]
pub struct FingerTable {
    did: Did,
    size: usize,
    finger: Vec<Option<NodeRef>>,
    #[derivative(PartialEq = "ignore")]
    pub(super) fix_finger_index: u8,
}

impl FingerTable {
    /// builder
    pub fn new(did: Did, size: usize) -> Self {
        Self {
            did,
            size,
            finger: vec![None; size],
            fix_finger_index: 0,
        }
    }

    /// is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get first element from Finger Table
    pub fn first(&self) -> Option<NodeRef> {
        self.finger.iter().flatten().next().cloned()
    }

    /// getter
    pub fn get(&self, index: usize) -> Option<NodeRef> {
        self.finger.get(index).cloned().flatten()
    }

    /// setter
    pub fn set(&mut self, index: usize, node: NodeRef) {
        tracing::debug!("set finger table index: {} node: {}", index, node);
        if index >= self.finger.len() {
            tracing::error!("set finger index out of range, index: {}", index);
            return;
        }
        if node.did == self.did {
            tracing::debug!("set finger table with self did, ignore it");
            return;
        }
        self.finger[index] = Some(node);
    }

    /// Set the entry under the current fix index.
    pub fn set_fix(&mut self, node: NodeRef) {
        let index = self.fix_finger_index as usize;
        self.set(index, node)
    }

    /// Advance the round-robin fix index and return `(index, start)` of the entry to refresh.
    pub fn next_fix(&mut self) -> (usize, Did) {
        self.fix_finger_index = ((self.fix_finger_index as usize + 1) % self.size) as u8;
        let index = self.fix_finger_index as usize;
        (index, self.did.finger_start(index as u32))
    }

    /// remove a node from dht finger table
    pub fn remove(&mut self, did: Did) {
        let indexes: Vec<usize> = self
            .finger
            .iter()
            .enumerate()
            .filter(|(_, x)| x.as_ref().map(|n| n.did) == Some(did))
            .map(|(id, _)| id)
            .collect();

        if let (Some(first_idx), Some(last_idx)) = (indexes.first(), indexes.last()) {
            let (first_idx, end_idx) = (*first_idx, *last_idx + 1);

            // Update to the next node after the last removed entry.
            // If cannot get that, use None.
            let fix_node = self.finger.get(end_idx).cloned().flatten();

            for idx in first_idx..end_idx {
                self.finger[idx] = fix_node.clone()
            }
        }
    }

    /// Join FingerTable, placing the node at every entry it serves better than the current one.
    pub fn join(&mut self, node: NodeRef) {
        if node.did == self.did {
            return;
        }
        let bias = node.did.bias(self.did);

        for k in 0u32..self.size as u32 {
            let pos = Did::from(BigUint::from(2u16).pow(k));

            if bias.pos() < pos {
                continue;
            }

            if let Some(v) = &self.finger[k as usize] {
                if bias > v.did.bias(self.did) {
                    continue;
                }
            }

            self.finger[k as usize] = Some(node.clone());
        }
    }

    /// get length of finger
    pub fn len(&self) -> usize {
        self.finger.iter().flatten().count()
    }

    /// get finger list
    pub fn list(&self) -> &Vec<Option<NodeRef>> {
        &self.finger
    }

    #[cfg(test)]
    pub fn reset_finger(&mut self) {
        self.finger = vec![None; self.size]
    }
}
