//! JSON-RPC surface of chordkv nodes.
//! - [Method](crate::method::Method) names every call a node serves.
//! - [codec] maps node requests and responses to JSON-RPC params and results.
//! - [Client](crate::jsonrpc::Client) calls a node, [HttpTransport](crate::transport::HttpTransport)
//!   plugs it into the ring as a transport.

pub mod codec;
pub mod error;
pub mod jsonrpc;
pub mod method;
pub mod transport;

pub mod prelude {
    pub use jsonrpc_core;
    pub use reqwest;
}
