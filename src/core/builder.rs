use std::sync::Arc;
use std::time::Duration;

use crate::core::config::{PoolConfig, RunCompletion};
use crate::core::pool::Pool;
use crate::entry::{HookRef, RunRef};
use crate::error::ConfigError;
use crate::policies::RevivePolicy;
use crate::subscribers::{LogWriter, Subscribe};

/// Builder for a [`Pool`].
///
/// Starts from [`PoolConfig::new`] defaults; every setter overrides one field.
pub struct PoolBuilder {
    cfg: PoolConfig,
    subscribers: Option<Vec<Arc<dyn Subscribe>>>,
    env_overrides: bool,
}

impl PoolBuilder {
    pub fn new(run: RunRef) -> Self {
        Self::from_config(PoolConfig::new(run))
    }

    /// Starts from an existing configuration.
    pub fn from_config(cfg: PoolConfig) -> Self {
        Self {
            cfg,
            subscribers: None,
            env_overrides: false,
        }
    }

    /// Number of workers to keep alive.
    pub fn workers(mut self, n: usize) -> Self {
        self.cfg.workers = n;
        self
    }

    /// Graceful window before workers are forced down.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.cfg.timeout = timeout;
        self
    }

    /// Hook each worker runs once on graceful shutdown.
    pub fn shutdown_hook(mut self, hook: HookRef) -> Self {
        self.cfg.shutdown = Some(hook);
        self
    }

    pub fn revive(mut self, revive: RevivePolicy) -> Self {
        self.cfg.revive = revive;
        self
    }

    pub fn on_run_complete(mut self, completion: RunCompletion) -> Self {
        self.cfg.on_run_complete = completion;
        self
    }

    pub fn bus_capacity(mut self, capacity: usize) -> Self {
        self.cfg.bus_capacity = capacity;
        self
    }

    /// Sets event subscribers, replacing the default [`LogWriter`].
    ///
    /// Subscribers receive master events through dedicated workers with
    /// bounded queues. An empty list disables event delivery.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = Some(subscribers);
        self
    }

    /// Applies `POOLVISOR_WORKERS` / `POOLVISOR_TIMEOUT_MS` at build time.
    pub fn with_env_overrides(mut self) -> Self {
        self.env_overrides = true;
        self
    }

    /// Validates the configuration and returns the pool.
    pub fn build(self) -> Result<Pool, ConfigError> {
        let cfg = if self.env_overrides {
            self.cfg.with_env_overrides()?
        } else {
            self.cfg
        };
        cfg.validate()?;

        let subscribers = self
            .subscribers
            .unwrap_or_else(|| vec![Arc::new(LogWriter) as Arc<dyn Subscribe>]);
        Ok(Pool::from_parts(cfg, subscribers))
    }
}
