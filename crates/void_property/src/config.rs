//! Runtime Configuration
//!
//! Selects how the runtime schedules proxy flushes and how engine values
//! and proxies behave by default.
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables: `VOID_SYNC_QUEUE_MODE=threaded`, `VOID_SYNC_LOG=debug`
//! 2. Config file passed to [`RuntimeConfig::load`]
//! 3. Defaults
//!
//! # Example Config File
//!
//! ```toml
//! [task_queue]
//! mode = "polling"   # polling, threaded
//! name = "engine"
//!
//! [engine]
//! push_mode = "deferred"        # deferred, direct
//! conflict_policy = "to_engine" # to_engine, from_engine
//!
//! [proxy]
//! refresh_on_change = true
//! unknown_member = "error"      # error, ignore
//!
//! [log]
//! filter = "info"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{ConflictPolicy, EngineValueOptions, PushMode};
use crate::proxy::{ProxyOptions, UnknownMember};
use crate::task_queue::{PollingTaskQueue, TaskQueue, ThreadedTaskQueue};

/// Environment variable overriding [`TaskQueueConfig::mode`]
pub const ENV_QUEUE_MODE: &str = "VOID_SYNC_QUEUE_MODE";
/// Environment variable overriding [`LogConfig::filter`]
pub const ENV_LOG: &str = "VOID_SYNC_LOG";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown task queue mode '{0}'")]
    UnknownQueueMode(String),
    #[error("failed to start task queue worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// How flush tasks are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueMode {
    /// The engine thread drains the queue once per tick
    #[default]
    Polling,
    /// A dedicated worker thread drains the queue
    Threaded,
}

impl std::fmt::Display for QueueMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Polling => write!(f, "polling"),
            Self::Threaded => write!(f, "threaded"),
        }
    }
}

impl std::str::FromStr for QueueMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "polling" | "poll" | "tick" => Ok(Self::Polling),
            "threaded" | "thread" | "worker" => Ok(Self::Threaded),
            _ => Err(ConfigError::UnknownQueueMode(s.to_string())),
        }
    }
}

/// Task queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskQueueConfig {
    pub mode: QueueMode,
    /// Queue name, also the worker thread name
    pub name: String,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            mode: QueueMode::Polling,
            name: "engine".to_string(),
        }
    }
}

/// Engine value defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub push_mode: PushMode,
    /// Winner of an auto sync when both sides changed
    pub conflict_policy: ConflictPolicy,
}

/// Proxy defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub refresh_on_change: bool,
    pub unknown_member: UnknownMember,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        let options = ProxyOptions::default();
        Self {
            refresh_on_change: options.refresh_on_change,
            unknown_member: options.unknown_member,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `env_logger` filter string
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub task_queue: TaskQueueConfig,
    pub engine: EngineConfig,
    pub proxy: ProxyConfig,
    pub log: LogConfig,
    /// File this config was loaded from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Queue built from a [`TaskQueueConfig`]
#[derive(Clone)]
pub enum RuntimeQueue {
    Polling(Arc<PollingTaskQueue>),
    Threaded(Arc<ThreadedTaskQueue>),
}

impl RuntimeQueue {
    /// Queue as a trait object, for proxies
    pub fn as_dyn(&self) -> Arc<dyn TaskQueue> {
        match self {
            Self::Polling(queue) => queue.clone() as Arc<dyn TaskQueue>,
            Self::Threaded(queue) => queue.clone() as Arc<dyn TaskQueue>,
        }
    }

    /// Run what is pending. Polling queues run it on the calling thread;
    /// threaded queues are waited on. Returns the number of tasks run
    /// here.
    pub fn pump(&self) -> usize {
        match self {
            Self::Polling(queue) => queue.process_tasks(),
            Self::Threaded(queue) => {
                queue.wait();
                0
            }
        }
    }
}

impl RuntimeConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a TOML file and apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        log::info!("Loaded runtime config from {}", path.display());
        config.apply_env()?;
        Ok(config)
    }

    /// Override from `VOID_SYNC_*` environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(mode) = var(ENV_QUEUE_MODE) {
            self.task_queue.mode = mode.parse()?;
            log::info!("Task queue mode from env: {}", self.task_queue.mode);
        }
        if let Some(filter) = var(ENV_LOG) {
            if !filter.is_empty() {
                self.log.filter = filter;
            }
        }
        Ok(())
    }

    /// Options for engine values built by a manager
    pub fn engine_options(&self) -> EngineValueOptions {
        EngineValueOptions {
            push_mode: self.engine.push_mode,
            conflict: self.engine.conflict_policy,
            ..EngineValueOptions::default()
        }
    }

    /// Options for proxies
    pub fn proxy_options(&self) -> ProxyOptions {
        ProxyOptions {
            refresh_on_change: self.proxy.refresh_on_change,
            unknown_member: self.proxy.unknown_member,
        }
    }

    /// Build the configured task queue
    pub fn build_queue(&self) -> Result<RuntimeQueue, ConfigError> {
        let name = self.task_queue.name.clone();
        Ok(match self.task_queue.mode {
            QueueMode::Polling => RuntimeQueue::Polling(Arc::new(PollingTaskQueue::new(name))),
            QueueMode::Threaded => {
                RuntimeQueue::Threaded(Arc::new(ThreadedTaskQueue::new(name).map_err(ConfigError::Spawn)?))
            }
        })
    }
}
