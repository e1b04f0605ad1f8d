#![warn(missing_docs)]

//! Processor of chordkv-node rpc server.

use std::sync::Arc;
use std::sync::Mutex;

use chordkv_core::dht::Stabilizer;
use chordkv_core::dht::StabilizerIntervals;
use chordkv_core::inspect::NodeStats;
use chordkv_core::message::MessageHandler;
use chordkv_core::swarm::Swarm;
use chordkv_core::swarm::SwarmBuilder;
use chordkv_core::transport::Transport;
use chordkv_rpc::codec;
use chordkv_rpc::transport::HttpTransport;
use jsonrpc_core::Params;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::error::Result;
use crate::native::config::Config;

/// Builds a [Processor] from a [Config].
pub struct ProcessorBuilder {
    config: Config,
    transport: Option<Arc<dyn Transport>>,
}

impl ProcessorBuilder {
    /// Initialize the builder with a config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            config: config.clone(),
            transport: None,
        }
    }

    /// Initialize the builder with a yaml serialized config.
    pub fn from_serialized(config: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(config)?;
        Ok(Self::from_config(&config))
    }

    /// Send remote calls through `transport` instead of http.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the [Processor].
    pub fn build(self) -> Result<Processor> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(self.config.rpc_timeout())?),
        };
        let swarm = SwarmBuilder::new(self.config.endpoint(), transport)
            .replication_factor(self.config.replication_factor)
            .max_hops(self.config.max_hops)
            .rpc_timeout(self.config.rpc_timeout())
            .build()?;
        Ok(Processor::new(
            Arc::new(swarm),
            StabilizerIntervals::from(&self.config),
        ))
    }
}

/// Processor for chordkv-node jsonrpc server
pub struct Processor {
    /// a swarm instance
    pub swarm: Arc<Swarm>,
    stabilizer: Arc<Stabilizer>,
    intervals: StabilizerIntervals,
    token: CancellationToken,
    maintenance: Mutex<Vec<JoinHandle<()>>>,
}

impl Processor {
    /// Wrap a swarm, its maintenance loops run at `intervals` once started.
    pub fn new(swarm: Arc<Swarm>, intervals: StabilizerIntervals) -> Self {
        Self {
            stabilizer: Arc::new(Stabilizer::new(swarm.clone())),
            swarm,
            intervals,
            token: CancellationToken::new(),
            maintenance: Mutex::new(vec![]),
        }
    }

    /// Cancelled on shutdown.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Join the ring of `bootstrap`, or start a new one.
    pub async fn join_or_create(&self, bootstrap: Option<&str>) -> Result<()> {
        match bootstrap {
            Some(bootstrap) => self.swarm.join(bootstrap).await?,
            None => self.swarm.create()?,
        }
        Ok(())
    }

    /// Spawn the maintenance loops. Calling it again is a no-op.
    pub fn start_maintenance(&self) -> Result<()> {
        let mut maintenance = self.maintenance.lock().map_err(|_| Error::Lock)?;
        if !maintenance.is_empty() {
            return Ok(());
        }
        *maintenance = self
            .stabilizer
            .clone()
            .spawn(&self.intervals, self.token.clone());
        tracing::info!(
            "{} maintenance started, {:?}",
            self.swarm.node(),
            self.intervals
        );
        Ok(())
    }

    /// Stop the maintenance loops and wait for them to end.
    pub async fn shutdown(&self) -> Result<()> {
        self.token.cancel();
        let handles = {
            let mut maintenance = self.maintenance.lock().map_err(|_| Error::Lock)?;
            std::mem::take(&mut *maintenance)
        };
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("maintenance task failed to stop: {}", e);
            }
        }
        tracing::info!("{} stopped", self.swarm.node());
        Ok(())
    }

    /// Serve one JSON-RPC call.
    pub async fn handle_rpc(&self, method: &str, params: Params) -> Result<Value> {
        let req = codec::decode_request(method, params)?;
        let resp = MessageHandler::new(self.swarm.clone())
            .handle_request(req)
            .await?;
        Ok(codec::encode_response(&resp)?)
    }

    /// Stats of the local node.
    pub async fn stats(&self) -> Result<NodeStats> {
        Ok(self.swarm.stats().await?)
    }
}
