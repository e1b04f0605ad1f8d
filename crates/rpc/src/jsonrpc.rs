//! chordkv-rpc client

use std::time::Duration;

use chordkv_core::dht::Did;
use chordkv_core::inspect::NodeStats;
use chordkv_core::message::*;
use chordkv_core::storage::Entry;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;

use crate::codec;
use crate::method::Method;
use crate::prelude::reqwest::Client as HttpClient;

/// Wrap json_client send request between nodes, or from the command line to a node.
#[derive(Clone)]
pub struct Client {
    client: HttpClient,
    endpoint_url: String,
}

/// The errors returned by the client.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// An error returned by the server.
    #[error("Server returned rpc error {0}")]
    JsonClientError(jsonrpc_core::Error),
    /// Failure to parse server response.
    #[error("Failed to parse server response as {0}: {1}")]
    ParseError(String, Box<dyn std::error::Error + Send + Sync>),
    /// The server could not be contacted.
    #[error("Failed to connect {0}")]
    Connect(String),
    /// Request timed out.
    #[error("Request timed out")]
    Timeout,
    /// A general client error.
    #[error("Client error: {0}")]
    Client(String),
}

/// A wrap `Result` contains ClientError.
type Result<T> = std::result::Result<T, RpcError>;

/// URL of the rpc endpoint of a node, `endpoint` being either `host:port` or a full url.
pub fn endpoint_url(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}/", endpoint)
    }
}

impl Client {
    /// Creates a new Client instance with the specified endpoint URL
    pub fn new(endpoint_url: &str) -> Self {
        Self::with_http_client(endpoint_url, HttpClient::default())
    }

    /// Creates a new Client instance sharing an http client.
    pub fn with_http_client(endpoint_url: &str, client: HttpClient) -> Self {
        Self {
            client,
            endpoint_url: endpoint_url.to_string(),
        }
    }

    /// Creates a new Client instance failing every call after `timeout`.
    pub fn with_timeout(endpoint_url: &str, timeout: Duration) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Client(e.to_string()))?;
        Ok(Self::with_http_client(endpoint_url, client))
    }

    pub async fn call_method<T>(&self, method: Method, params: Map<String, Value>) -> Result<T>
    where T: DeserializeOwned {
        use jsonrpc_core::*;

        let jsonrpc_request = Request::Single(Call::MethodCall(MethodCall {
            jsonrpc: Some(Version::V2),
            method: method.to_string(),
            params: Params::Map(params),
            id: Id::Num(1),
        }));

        let result = self.do_jsonrpc_request(&jsonrpc_request).await?;
        serde_json::from_value(result)
            .map_err(|e| RpcError::ParseError(e.to_string(), Box::new(e)))
    }

    async fn do_jsonrpc_request(&self, req: &jsonrpc_core::Request) -> Result<Value> {
        let body = serde_json::to_string(req).map_err(|e| RpcError::Client(e.to_string()))?;

        let req = self
            .client
            .post(self.endpoint_url.as_str())
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .body(body);

        let resp = req
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::Timeout
                } else if e.is_connect() || e.is_request() {
                    RpcError::Connect(e.to_string())
                } else {
                    RpcError::Client(e.to_string())
                }
            })?
            .error_for_status()
            .map_err(|e| RpcError::Client(e.to_string()))?
            .bytes()
            .await
            .map_err(|e| RpcError::ParseError(e.to_string(), Box::new(e)))?;

        let jsonrpc_resp = jsonrpc_core::Response::from_json(&String::from_utf8_lossy(&resp))
            .map_err(|e| RpcError::ParseError(e.to_string(), Box::new(e)))?;

        match jsonrpc_resp {
            jsonrpc_core::Response::Single(resp) => match resp {
                jsonrpc_core::Output::Success(success) => Ok(success.result),
                jsonrpc_core::Output::Failure(failure) => {
                    Err(RpcError::JsonClientError(failure.error))
                }
            },
            jsonrpc_core::Response::Batch(_) => Err(RpcError::Client(
                "Batch response is not supported".to_string(),
            )),
        }
    }

    /// Send a node request and return the node response.
    pub async fn request(&self, req: &chordkv_core::message::Request) -> Result<Response> {
        let (method, params) =
            codec::encode_request(req).map_err(|e| RpcError::Client(e.to_string()))?;
        let value: Value = self.call_method(method, params).await?;
        codec::decode_response(value).map_err(|e| RpcError::ParseError(e.to_string(), Box::new(e)))
    }

    async fn expect<T>(
        &self,
        req: chordkv_core::message::Request,
        unpack: impl FnOnce(Response) -> Option<T>,
    ) -> Result<T> {
        let resp = self.request(&req).await?;
        let desc = format!("{:?}", resp);
        unpack(resp).ok_or_else(|| RpcError::Client(format!("unexpected response {}", desc)))
    }

    /// Write a key through the node.
    pub async fn put(&self, key: &str, value: Vec<u8>) -> Result<StoreReport> {
        let req = chordkv_core::message::Request::Put(PutSend {
            key: key.to_string(),
            value,
            hops: 0,
        });
        self.expect(req, |r| match r {
            Response::Stored(x) => Some(x),
            _ => None,
        })
        .await
    }

    /// Read a key through the node.
    pub async fn get(&self, key: &str) -> Result<Option<Entry>> {
        let req = chordkv_core::message::Request::Get(GetSend {
            key: key.to_string(),
        });
        self.expect(req, |r| match r {
            Response::Fetched(x) => Some(x.entry),
            _ => None,
        })
        .await
    }

    /// Delete a key through the node.
    pub async fn delete(&self, key: &str) -> Result<DeleteReport> {
        let req = chordkv_core::message::Request::Delete(DeleteSend {
            key: key.to_string(),
            hops: 0,
        });
        self.expect(req, |r| match r {
            Response::Deleted(x) => Some(x),
            _ => None,
        })
        .await
    }

    /// Ask the node for the owner of `did`.
    pub async fn find_successor(&self, did: Did) -> Result<FindSuccessorReport> {
        let req = chordkv_core::message::Request::FindSuccessor(FindSuccessorSend { did, hops: 0 });
        self.expect(req, |r| match r {
            Response::FindSuccessor(x) => Some(x),
            _ => None,
        })
        .await
    }

    /// Query for node stats.
    pub async fn stats(&self) -> Result<NodeStats> {
        let req = chordkv_core::message::Request::Stats(StatsSend {});
        self.expect(req, |r| match r {
            Response::Stats(x) => Some(*x),
            _ => None,
        })
        .await
    }
}
