//! Command line client of a running node.
use std::time::Duration;

use chordkv_core::dht::Did;
use chordkv_core::inspect::NodeStats;
use chordkv_core::message::DeleteReport;
use chordkv_core::message::FindSuccessorReport;
use chordkv_core::message::StoreReport;
use chordkv_core::storage::Entry;
use chordkv_rpc::jsonrpc;

use crate::error::Error;

#[derive(Clone)]
pub struct Client {
    client: jsonrpc::Client,
}

pub struct ClientOutput<T> {
    pub result: T,
    display: String,
}
type Output<T> = anyhow::Result<ClientOutput<T>>;

impl Client {
    pub fn new(endpoint_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = jsonrpc::Client::with_timeout(&jsonrpc::endpoint_url(endpoint_url), timeout)
            .map_err(Error::from)?;
        Ok(Self { client })
    }

    pub async fn put(&self, key: &str, value: &str) -> Output<StoreReport> {
        let report = self
            .client
            .put(key, value.as_bytes().to_vec())
            .await
            .map_err(Error::from)?;
        tracing::debug!("resp: {:?}", report);
        ClientOutput::ok(
            format!(
                "Stored {} at {}, version {}, {} replicas",
                key, report.owner, report.version, report.replicas
            ),
            report,
        )
    }

    pub async fn get(&self, key: &str) -> Output<Option<Entry>> {
        let entry = self.client.get(key).await.map_err(Error::from)?;
        let display = match &entry {
            Some(e) => String::from_utf8_lossy(&e.value).to_string(),
            None => format!("Key {} not found", key),
        };
        ClientOutput::ok(display, entry)
    }

    pub async fn delete(&self, key: &str) -> Output<DeleteReport> {
        let report = self.client.delete(key).await.map_err(Error::from)?;
        let display = if report.existed {
            format!("Deleted {}, {} replicas dropped", key, report.replicas)
        } else {
            format!("Key {} not found", key)
        };
        ClientOutput::ok(display, report)
    }

    /// Owner of `key`, a 40 hex digit identifier is used as is.
    pub async fn find(&self, key: &str) -> Output<FindSuccessorReport> {
        let did = key.parse::<Did>().unwrap_or_else(|_| Did::from_key(key));
        let report = self
            .client
            .find_successor(did)
            .await
            .map_err(Error::from)?;
        ClientOutput::ok(
            format!("{} is owned by {} after {} hops", did, report.node, report.hops),
            report,
        )
    }

    pub async fn stats(&self) -> Output<NodeStats> {
        let stats = self.client.stats().await.map_err(Error::from)?;
        let display = serde_json::to_string_pretty(&stats).map_err(Error::from)?;
        ClientOutput::ok(display, stats)
    }
}

impl<T> ClientOutput<T> {
    // Put display ahead to avoid moved value error.
    pub fn ok(display: String, result: T) -> anyhow::Result<Self> {
        Ok(Self { result, display })
    }

    pub fn display(&self) {
        println!("{}", self.display);
    }
}
