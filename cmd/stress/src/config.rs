//! Stress run configuration.
//!
//! A config file (YAML or JSON, picked by extension) overrides the built-in
//! defaults; command line flags override the file.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// How producers and consumers talk to the buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// `put` / `take`, waiting as long as needed.
    #[default]
    Blocking,
    /// `put_timeout` / `take_timeout`, retrying after each timeout.
    Timed,
    /// `try_put` / `try_take`, yielding after each would-block.
    Try,
}

/// Parameters of one stress run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StressConfig {
    /// Buffer capacity.
    pub capacity: usize,
    /// Number of producer threads.
    pub producers: usize,
    /// Number of consumer threads.
    pub consumers: usize,
    /// Items each producer tries to put.
    pub items_per_producer: u64,
    /// Operation flavour used by every thread.
    pub mode: Mode,
    /// Per-operation wait in timed mode, in milliseconds.
    pub op_timeout_ms: u64,
    /// Whole-run limit; the buffer is force-closed when it elapses.
    pub deadline_secs: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            capacity: 4,
            producers: 4,
            consumers: 4,
            items_per_producer: 10_000,
            mode: Mode::Blocking,
            op_timeout_ms: 5,
            deadline_secs: 30,
        }
    }
}

impl StressConfig {
    /// Loads a config file. Fields missing from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;

        let cfg: StressConfig = match ext {
            "json" => serde_json::from_slice(&data)
                .with_context(|| format!("invalid JSON config {}", path.display()))?,
            "yaml" | "yml" => serde_yaml::from_slice(&data)
                .with_context(|| format!("invalid YAML config {}", path.display()))?,
            _ => anyhow::bail!("unsupported config extension: {:?}", ext),
        };
        Ok(cfg)
    }

    /// Rejects configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            anyhow::bail!("capacity must be greater than 0");
        }
        if self.producers == 0 {
            anyhow::bail!("producers must be greater than 0");
        }
        if self.consumers == 0 {
            anyhow::bail!("consumers must be greater than 0");
        }
        if self.deadline_secs == 0 {
            anyhow::bail!("deadline_secs must be greater than 0");
        }
        if self.mode == Mode::Timed && self.op_timeout_ms == 0 {
            anyhow::bail!("op_timeout_ms must be greater than 0 in timed mode");
        }
        let total = (self.producers as u64).checked_mul(self.items_per_producer);
        if total.is_none_or(|n| usize::try_from(n).is_err()) {
            anyhow::bail!(
                "producers * items_per_producer overflows ({} * {})",
                self.producers,
                self.items_per_producer
            );
        }
        Ok(())
    }

    /// Per-operation timeout for timed mode.
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    /// Whole-run deadline.
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    /// Total number of items the producers attempt to put. Only meaningful
    /// on a config that passed [`validate`](Self::validate).
    pub fn total_items(&self) -> u64 {
        self.producers as u64 * self.items_per_producer
    }
}
