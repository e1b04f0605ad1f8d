//! Lookups over the ring.

use crate::consts::MAX_ROUTE_ATTEMPTS;
use crate::dht::Did;
use crate::dht::NodeRef;
use crate::dht::PeerRingAction;
use crate::dht::PeerRingRemoteAction;
use crate::error::Error;
use crate::error::Result;
use crate::message::FindSuccessorReport;
use crate::swarm::Swarm;

impl Swarm {
    /// Resolve the node owning `did`, `hops` being the hops already taken by this lookup.
    pub async fn lookup(&self, did: Did, hops: u32) -> Result<FindSuccessorReport> {
        self.lookup_excluding(did, hops, vec![]).await
    }

    /// Resolve the node owning `did`, never routing through the nodes in `excluded`.
    ///
    /// A next hop that cannot be reached is dropped from the finger table and the step is
    /// retried through another candidate, up to [MAX_ROUTE_ATTEMPTS] times.
    pub async fn lookup_excluding(
        &self,
        did: Did,
        hops: u32,
        mut excluded: Vec<Did>,
    ) -> Result<FindSuccessorReport> {
        if hops > self.max_hops {
            return Err(Error::RoutingExhausted { did, hops });
        }

        if let Some(pre) = self.dht.predecessor()? {
            if !excluded.contains(&self.did()) && did.in_range(pre.did, self.did()) {
                return Ok(self.found(self.node().clone(), hops));
            }
        }

        for _ in 0..MAX_ROUTE_ATTEMPTS {
            match self.dht.route(did, &excluded)? {
                PeerRingAction::Some(node) => return Ok(self.found(node, hops)),
                PeerRingAction::RemoteAction(next, PeerRingRemoteAction::FindSuccessor(did)) => {
                    match self.client.find_successor(&next, did, hops + 1).await {
                        Ok(report) => {
                            if hops == 0 {
                                self.record_lookup(report.hops);
                            }
                            return Ok(report);
                        }
                        Err(e) if e.is_unreachable() => {
                            tracing::warn!("next hop {} for {} is unreachable", next, did);
                            self.dht.remove_finger(next.did)?;
                            excluded.push(next.did);
                        }
                        Err(e) => return Err(e),
                    }
                }
                act => return Err(Error::PeerRingUnexpectedAction(act)),
            }
        }
        Err(Error::RoutingExhausted { did, hops })
    }

    fn found(&self, node: NodeRef, hops: u32) -> FindSuccessorReport {
        if hops == 0 {
            self.record_lookup(0);
        }
        FindSuccessorReport { node, hops }
    }
}
