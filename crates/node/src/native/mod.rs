//! Daemon side of the node: config file and the JSON-RPC http endpoint.
pub mod config;
pub mod endpoint;
