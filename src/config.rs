//! Client configuration and the registry that publishes it.
//!
//! A [`Config`] is an immutable snapshot; reconfiguration never patches a
//! published config in place, it swaps in a fresh one. Workers snapshot the
//! active config at the start of each call, so a concurrent
//! [`Registry::reconfigure`] can never pull memory out from under an
//! in-flight command: the superseded config lives until its last holder
//! drops it.

use crate::{DEFAULT_PORT, DEFAULT_TIMEOUT};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;
use tracing::debug;

/// Default host a freshly initialized registry points at.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Where and how to reach the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    host: String,
    port: u16,
    timeout: Duration,
}

impl Config {
    /// Build a config, applying the defaults for out-of-range inputs: a port
    /// outside `1..=65535` becomes 6379 and a timeout of zero or less
    /// becomes 200 ms.
    ///
    /// The signed parameters are deliberate; host frameworks hand through
    /// integer settings where "not set" arrives as zero or a negative value.
    pub fn new(host: impl ToString, port: i32, timeout_ms: i64) -> Config {
        let port = if port <= 0 {
            DEFAULT_PORT
        } else {
            u16::try_from(port).unwrap_or(DEFAULT_PORT)
        };

        let timeout = if timeout_ms <= 0 {
            DEFAULT_TIMEOUT
        } else {
            Duration::from_millis(timeout_ms as u64)
        };

        Config {
            host: host.to_string(),
            port,
            timeout,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Bound applied to connect and per-command I/O.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new(DEFAULT_HOST, i32::from(DEFAULT_PORT), 0)
    }
}

/// Holds the active [`Config`] for one logical client instance.
///
/// Reads are a lock acquisition plus an `Arc` clone; writes swap the `Arc`.
/// Cloning the registry handle is the host framework's job — wrap it in an
/// `Arc` and hand one to every worker.
#[derive(Debug)]
pub struct Registry {
    active: RwLock<Arc<Config>>,
}

impl Registry {
    pub fn new(config: Config) -> Registry {
        Registry {
            active: RwLock::new(Arc::new(config)),
        }
    }

    /// Validate, build and publish a new active config.
    ///
    /// Safe to call while other workers are mid-command: they keep the
    /// snapshot they started with and the old config is reclaimed once the
    /// last of them finishes.
    pub fn reconfigure(&self, host: impl ToString, port: i32, timeout_ms: i64) {
        let next = Arc::new(Config::new(host, port, timeout_ms));
        debug!(config = ?next, "publishing new config");

        let mut active = self.active.write().unwrap();
        *active = next;
    }

    /// The active snapshot. Never blocks on in-flight commands.
    pub fn current(&self) -> Arc<Config> {
        self.active.read().unwrap().clone()
    }
}

impl Default for Registry {
    fn default() -> Registry {
        Registry::new(Config::default())
    }
}

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

/// Process-wide registry with the default config, created on first call.
///
/// Idempotent: every call returns the same registry no matter how many
/// workers race on first use. Host frameworks that manage several logical
/// client instances should build their own [`Registry`] values instead.
pub fn initialize() -> Arc<Registry> {
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(Registry::default())))
}
