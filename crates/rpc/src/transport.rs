//! [Transport] over JSON-RPC on http.

use std::time::Duration;

use async_trait::async_trait;
use chordkv_core::dht::NodeRef;
use chordkv_core::error::Error;
use chordkv_core::error::Result;
use chordkv_core::message::Request;
use chordkv_core::message::Response;
use chordkv_core::transport::Transport;

use crate::error::from_jsonrpc_error;
use crate::jsonrpc::endpoint_url;
use crate::jsonrpc::Client;
use crate::jsonrpc::RpcError;
use crate::prelude::reqwest::Client as HttpClient;

/// Sends node requests as JSON-RPC calls to `http://{endpoint}/`.
/// One http client, and its connection pool, is shared by every target.
#[derive(Clone)]
pub struct HttpTransport {
    client: HttpClient,
}

impl HttpTransport {
    /// Connections fail after `connect_timeout`. Whole calls are bounded by the caller, which
    /// gives forwarded calls longer than single ones.
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let client = HttpClient::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| Error::InvalidArgument(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, target: &NodeRef, req: Request) -> Result<Response> {
        let client = Client::with_http_client(&endpoint_url(&target.endpoint), self.client.clone());
        client.request(&req).await.map_err(|e| match e {
            RpcError::Connect(_) | RpcError::Timeout => {
                tracing::debug!("{} is unreachable: {}", target, e);
                Error::Unreachable(target.endpoint.clone())
            }
            RpcError::JsonClientError(e) => from_jsonrpc_error(e),
            e => Error::RemoteFailure(e.to_string()),
        })
    }
}
