//! chordkv node: the daemon serving a [chordkv_core::swarm::Swarm] over JSON-RPC, and the
//! command line client talking to it.
//!
//! A daemon is started from a [native::config::Config]. The [processor::Processor] owns the
//! swarm and its maintenance loops, [native::endpoint] serves it on `POST /`.
pub mod cli;
pub mod error;
pub mod logging;
pub mod native;
pub mod processor;
#[cfg(test)]
mod tests;
pub mod util;
