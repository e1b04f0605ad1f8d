use std::fs;
use std::io;
use std::time::Duration;

use chordkv_core::consts::DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS;
use chordkv_core::consts::DEFAULT_FIX_FINGERS_INTERVAL_MS;
use chordkv_core::consts::DEFAULT_MAX_HOPS;
use chordkv_core::consts::DEFAULT_REPLICATION_FACTOR;
use chordkv_core::consts::DEFAULT_REPLICATION_SWEEP_INTERVAL_MS;
use chordkv_core::consts::DEFAULT_RPC_TIMEOUT_MS;
use chordkv_core::consts::DEFAULT_STABILIZE_INTERVAL_MS;
use chordkv_core::dht::StabilizerIntervals;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;
use crate::util::ensure_parent_dir;
use crate::util::expand_home;

pub const DEFAULT_CONFIG_PATH: &str = "~/.chordkv/config.yaml";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7000";

fn default_replication_factor() -> u8 {
    DEFAULT_REPLICATION_FACTOR
}

fn default_max_hops() -> u32 {
    DEFAULT_MAX_HOPS
}

fn default_rpc_timeout_ms() -> u64 {
    DEFAULT_RPC_TIMEOUT_MS
}

fn default_stabilize_interval_ms() -> u64 {
    DEFAULT_STABILIZE_INTERVAL_MS
}

fn default_fix_fingers_interval_ms() -> u64 {
    DEFAULT_FIX_FINGERS_INTERVAL_MS
}

fn default_check_predecessor_interval_ms() -> u64 {
    DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS
}

fn default_sweep_interval_ms() -> u64 {
    DEFAULT_REPLICATION_SWEEP_INTERVAL_MS
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Socket address the JSON-RPC server listens on.
    pub bind_addr: String,
    /// Address other nodes reach this one at, and the source of its identifier.
    /// Falls back to `bind_addr`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Endpoint of any ring member. A node without one starts a new ring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<String>,
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
    #[serde(default = "default_stabilize_interval_ms")]
    pub stabilize_interval_ms: u64,
    #[serde(default = "default_fix_fingers_interval_ms")]
    pub fix_fingers_interval_ms: u64,
    #[serde(default = "default_check_predecessor_interval_ms")]
    pub check_predecessor_interval_ms: u64,
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            endpoint: None,
            join: None,
            replication_factor: DEFAULT_REPLICATION_FACTOR,
            max_hops: DEFAULT_MAX_HOPS,
            rpc_timeout_ms: DEFAULT_RPC_TIMEOUT_MS,
            stabilize_interval_ms: DEFAULT_STABILIZE_INTERVAL_MS,
            fix_fingers_interval_ms: DEFAULT_FIX_FINGERS_INTERVAL_MS,
            check_predecessor_interval_ms: DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS,
            sweep_interval_ms: DEFAULT_REPLICATION_SWEEP_INTERVAL_MS,
        }
    }
}

impl From<&Config> for StabilizerIntervals {
    fn from(config: &Config) -> Self {
        Self {
            stabilize: Duration::from_millis(config.stabilize_interval_ms),
            fix_fingers: Duration::from_millis(config.fix_fingers_interval_ms),
            check_predecessor: Duration::from_millis(config.check_predecessor_interval_ms),
            sweep: Duration::from_millis(config.sweep_interval_ms),
        }
    }
}

impl Config {
    pub fn new(bind_addr: &str) -> Self {
        Self {
            bind_addr: bind_addr.to_string(),
            ..Default::default()
        }
    }

    /// The endpoint advertised to the ring.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(&self.bind_addr)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn write_fs<P>(&self, path: P) -> Result<String>
    where P: AsRef<std::path::Path> {
        let path = expand_home(path)?;
        ensure_parent_dir(&path)?;
        let f =
            fs::File::create(path.as_path()).map_err(|e| Error::CreateFileError(e.to_string()))?;
        let f_writer = io::BufWriter::new(f);
        serde_yaml::to_writer(f_writer, self)?;
        Ok(path.to_string_lossy().to_string())
    }

    pub fn read_fs<P>(path: P) -> Result<Config>
    where P: AsRef<std::path::Path> {
        let path = expand_home(path)?;
        tracing::debug!("Read config from: {:?}", path);
        let f = fs::File::open(path).map_err(|e| Error::OpenFileError(e.to_string()))?;
        let f_rdr = io::BufReader::new(f);
        Ok(serde_yaml::from_reader(f_rdr)?)
    }
}
