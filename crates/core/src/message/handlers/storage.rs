#![warn(missing_docs)]
//! Handlers of storage and replication messages.

use async_trait::async_trait;

use crate::error::Result;
use crate::message::types::*;
use crate::message::HandleMsg;
use crate::message::MessageHandler;

#[async_trait]
impl HandleMsg<PutSend> for MessageHandler {
    async fn handle(&self, msg: &PutSend) -> Result<Response> {
        let report = self
            .swarm
            .put(&msg.key, msg.value.clone(), msg.hops)
            .await?;
        Ok(Response::Stored(report))
    }
}

#[async_trait]
impl HandleMsg<GetSend> for MessageHandler {
    async fn handle(&self, msg: &GetSend) -> Result<Response> {
        Ok(Response::Fetched(FetchReport {
            entry: self.swarm.get(&msg.key).await?,
        }))
    }
}

#[async_trait]
impl HandleMsg<DeleteSend> for MessageHandler {
    async fn handle(&self, msg: &DeleteSend) -> Result<Response> {
        Ok(Response::Deleted(
            self.swarm.delete(&msg.key, msg.hops).await?,
        ))
    }
}

#[async_trait]
impl HandleMsg<StoreKeySend> for MessageHandler {
    async fn handle(&self, msg: &StoreKeySend) -> Result<Response> {
        Ok(Response::Stored(
            self.swarm.store_key(msg.entry.clone(), msg.hops).await?,
        ))
    }
}

#[async_trait]
impl HandleMsg<FetchKeySend> for MessageHandler {
    async fn handle(&self, msg: &FetchKeySend) -> Result<Response> {
        Ok(Response::Fetched(FetchReport {
            entry: self
                .swarm
                .fetch_key(&msg.key, msg.probe_successor)
                .await?,
        }))
    }
}

#[async_trait]
impl HandleMsg<ReplicatePushSend> for MessageHandler {
    async fn handle(&self, msg: &ReplicatePushSend) -> Result<Response> {
        Ok(Response::Ack(AckReport {
            changed: self.swarm.accept_replica(msg.entry.clone()).await?,
        }))
    }
}

#[async_trait]
impl HandleMsg<ReplicateDeleteSend> for MessageHandler {
    async fn handle(&self, msg: &ReplicateDeleteSend) -> Result<Response> {
        Ok(Response::Ack(AckReport {
            changed: self.swarm.drop_replica(&msg.key).await?,
        }))
    }
}

#[async_trait]
impl HandleMsg<TransferKeysSend> for MessageHandler {
    async fn handle(&self, msg: &TransferKeysSend) -> Result<Response> {
        Ok(Response::Transferred(TransferKeysReport {
            entries: self.swarm.transfer_keys(msg.start, msg.end).await?,
        }))
    }
}
