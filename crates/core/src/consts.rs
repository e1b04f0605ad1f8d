//! Constant variables.

/// Bits of an identifier, the ring has 2^160 positions.
pub const ID_BITS: usize = 160;

/// Nodes holding a copy of each key, one primary plus replicas.
pub const DEFAULT_REPLICATION_FACTOR: u8 = 3;
/// Forwarding limit of a single lookup.
pub const DEFAULT_MAX_HOPS: u32 = 64;
/// Local retries of a lookup when its next hop is unreachable.
pub const MAX_ROUTE_ATTEMPTS: usize = 3;

/// Remote call timeout in ms.
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 1000;

pub const DEFAULT_STABILIZE_INTERVAL_MS: u64 = 3000;
pub const DEFAULT_FIX_FINGERS_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS: u64 = 3000;
pub const DEFAULT_REPLICATION_SWEEP_INTERVAL_MS: u64 = 5000;

/// 1k
pub const MAX_KEY_LEN: usize = 1024;
/// 1M
pub const MAX_VALUE_LEN: usize = 1024 * 1024;
