#![warn(missing_docs)]
//! Handlers of ring maintenance messages.

use async_trait::async_trait;

use crate::dht::Chord;
use crate::dht::CorrectChord;
use crate::error::Result;
use crate::message::types::*;
use crate::message::HandleMsg;
use crate::message::MessageHandler;

#[async_trait]
impl HandleMsg<FindSuccessorSend> for MessageHandler {
    async fn handle(&self, msg: &FindSuccessorSend) -> Result<Response> {
        let report = self.swarm.lookup(msg.did, msg.hops).await?;
        Ok(Response::FindSuccessor(report))
    }
}

#[async_trait]
impl HandleMsg<GetPredecessorSend> for MessageHandler {
    async fn handle(&self, _msg: &GetPredecessorSend) -> Result<Response> {
        Ok(Response::Predecessor(PredecessorReport {
            predecessor: self.swarm.dht.predecessor()?,
        }))
    }
}

#[async_trait]
impl HandleMsg<QueryForTopoInfoSend> for MessageHandler {
    async fn handle(&self, _msg: &QueryForTopoInfoSend) -> Result<Response> {
        Ok(Response::TopoInfo(QueryForTopoInfoReport {
            info: self.swarm.dht.topo_info()?,
        }))
    }
}

#[async_trait]
impl HandleMsg<NotifyPredecessorSend> for MessageHandler {
    async fn handle(&self, msg: &NotifyPredecessorSend) -> Result<Response> {
        if self.swarm.dht.notify(msg.node.clone())? {
            self.swarm.on_predecessor_changed(msg.node.clone());
        }
        Ok(Response::NotifyPredecessor(NotifyPredecessorReport {
            predecessor: self.swarm.dht.predecessor()?,
        }))
    }
}

#[async_trait]
impl HandleMsg<PingSend> for MessageHandler {
    async fn handle(&self, _msg: &PingSend) -> Result<Response> {
        Ok(Response::Pong(PongReport {
            did: self.swarm.did(),
        }))
    }
}

#[async_trait]
impl HandleMsg<StatsSend> for MessageHandler {
    async fn handle(&self, _msg: &StatsSend) -> Result<Response> {
        Ok(Response::Stats(Box::new(self.swarm.stats().await?)))
    }
}
