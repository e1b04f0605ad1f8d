//! Stabilization run daemons to maintain dht.
//!
//! Every maintenance task runs in its own loop with its own interval, so a slow remote call
//! in one task never delays the others. All loops stop when their cancellation token fires.

use std::sync::Arc;
use std::time::Duration;

use futures::future::FutureExt;
use futures::pin_mut;
use futures::select;
use futures_timer::Delay;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::consts::DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS;
use crate::consts::DEFAULT_FIX_FINGERS_INTERVAL_MS;
use crate::consts::DEFAULT_REPLICATION_SWEEP_INTERVAL_MS;
use crate::consts::DEFAULT_STABILIZE_INTERVAL_MS;
use crate::dht::types::CorrectChord;
use crate::dht::Chord;
use crate::dht::PeerRing;
use crate::dht::PeerRingAction;
use crate::dht::PeerRingRemoteAction;
use crate::error::Error;
use crate::error::Result;
use crate::swarm::Swarm;

/// Periods of the maintenance tasks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StabilizerIntervals {
    /// Successor list refresh and notify.
    pub stabilize: Duration,
    /// One finger entry per round.
    pub fix_fingers: Duration,
    /// Predecessor liveness probe.
    pub check_predecessor: Duration,
    /// Promotion, migration and re-replication.
    pub sweep: Duration,
}

impl Default for StabilizerIntervals {
    fn default() -> Self {
        Self {
            stabilize: Duration::from_millis(DEFAULT_STABILIZE_INTERVAL_MS),
            fix_fingers: Duration::from_millis(DEFAULT_FIX_FINGERS_INTERVAL_MS),
            check_predecessor: Duration::from_millis(DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS),
            sweep: Duration::from_millis(DEFAULT_REPLICATION_SWEEP_INTERVAL_MS),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Task {
    Stabilize,
    FixFingers,
    CheckPredecessor,
    Sweep,
}

/// The stabilization runner.
#[derive(Clone)]
pub struct Stabilizer {
    swarm: Arc<Swarm>,
    dht: Arc<PeerRing>,
}

impl Stabilizer {
    /// Create a new stabilization runner.
    pub fn new(swarm: Arc<Swarm>) -> Self {
        let dht = swarm.dht();
        Self { swarm, dht }
    }

    /// Run every maintenance task once, in order.
    pub async fn run_once(&self) {
        tracing::debug!("STABILIZATION stabilize start");
        if let Err(e) = self.stabilize().await {
            tracing::error!("[stabilize] Failed on stabilize {:?}", e);
        }
        tracing::debug!("STABILIZATION fix_fingers start");
        if let Err(e) = self.fix_fingers().await {
            tracing::error!("[stabilize] Failed on fix_finger {:?}", e);
        }
        tracing::debug!("STABILIZATION check_predecessor start");
        if let Err(e) = self.check_predecessor().await {
            tracing::error!("[stabilize] Failed on check predecessor {:?}", e);
        }
        tracing::debug!("STABILIZATION sweep start");
        if let Err(e) = self.sweep_replicas().await {
            tracing::error!("[stabilize] Failed on sweep {:?}", e);
        }
        tracing::debug!("STABILIZATION end");
    }

    /// Refresh successor list and predecessor from the successor, then notify it.
    pub async fn stabilize(&self) -> Result<()> {
        let succ = match self.dht.pre_stabilize()? {
            PeerRingAction::RemoteAction(next, PeerRingRemoteAction::QueryForTopoInfo) => next,
            act => return Err(Error::PeerRingUnexpectedAction(act)),
        };

        let info = if succ == *self.swarm.node() {
            self.dht.topo_info()?
        } else {
            match self.swarm.client().topo_info(&succ).await {
                Ok(info) => info,
                Err(e) if e.is_unreachable() => {
                    return self.swarm.on_successor_failure(&succ).await;
                }
                Err(e) => return Err(e),
            }
        };

        let act = self.dht.stabilize(&succ, info)?;
        self.swarm.handle_dht_action(act).await
    }

    /// Fix the next finger, this is a DHT operation.
    pub async fn fix_fingers(&self) -> Result<()> {
        let act = self.dht.fix_fingers()?;
        if let PeerRingAction::RemoteAction(_, PeerRingRemoteAction::FindSuccessorForFix(did)) =
            &act
        {
            tracing::trace!("STABILIZATION fix_fingers: {}", did);
        }
        self.swarm.handle_dht_action(act).await
    }

    /// Drop the predecessor when it stopped answering.
    pub async fn check_predecessor(&self) -> Result<()> {
        let pre = match self.dht.predecessor()? {
            Some(pre) if pre != *self.swarm.node() => pre,
            _ => return Ok(()),
        };
        match self.swarm.client().ping(&pre).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_unreachable() => {
                tracing::warn!("predecessor {} is unreachable", pre);
                self.dht.remove(pre.did)
            }
            Err(e) => Err(e),
        }
    }

    /// Promote, migrate and re-replicate keys.
    pub async fn sweep_replicas(&self) -> Result<()> {
        self.swarm.sweep().await
    }

    async fn run(&self, task: Task) -> Result<()> {
        match task {
            Task::Stabilize => self.stabilize().await,
            Task::FixFingers => self.fix_fingers().await,
            Task::CheckPredecessor => self.check_predecessor().await,
            Task::Sweep => self.sweep_replicas().await,
        }
    }

    async fn wait(self: Arc<Self>, task: Task, interval: Duration, token: CancellationToken) {
        loop {
            let timeout = Delay::new(interval).fuse();
            let cancelled = token.cancelled().fuse();
            pin_mut!(timeout, cancelled);
            select! {
                _ = cancelled => {
                    tracing::debug!("STABILIZATION {:?} stopped", task);
                    break;
                }
                _ = timeout => self
                    .run(task)
                    .await
                    .unwrap_or_else(|e| tracing::error!("failed to run {:?}: {:?}", task, e)),
            }
        }
    }

    /// Spawn one loop per maintenance task. The loops end once `token` is cancelled.
    pub fn spawn(
        self: Arc<Self>,
        intervals: &StabilizerIntervals,
        token: CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        [
            (Task::Stabilize, intervals.stabilize),
            (Task::FixFingers, intervals.fix_fingers),
            (Task::CheckPredecessor, intervals.check_predecessor),
            (Task::Sweep, intervals.sweep),
        ]
        .into_iter()
        .map(|(task, interval)| tokio::spawn(self.clone().wait(task, interval, token.clone())))
        .collect()
    }
}
