//! Worker pool configuration.

use hearth_core::ConfigError;

/// Configuration for a [`WorkerPool`](crate::WorkerPool).
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of worker threads. `None` = auto-detect
    /// (`available_parallelism / 2`, clamped to `[2, 16]`).
    pub worker_count: Option<usize>,
    /// Worker threads are named `<prefix>-<index>`. Default:
    /// `"hearth-worker"`.
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: None,
            thread_name_prefix: "hearth-worker".into(),
        }
    }
}

impl PoolConfig {
    /// Check the configuration for values that would produce a pool
    /// that can never drain its queue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }

    /// Resolve the actual worker count, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, 64]`.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, 64),
            None => {
                let cpus = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4);
                (cpus / 2).clamp(2, 16)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_validates() {
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn explicit_zero_rejected() {
        let cfg = PoolConfig {
            worker_count: Some(0),
            ..PoolConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroWorkers));
        assert_eq!(cfg.resolved_worker_count(), 1);
    }

    #[test]
    fn explicit_count_clamped() {
        let cfg = PoolConfig {
            worker_count: Some(500),
            ..PoolConfig::default()
        };
        assert_eq!(cfg.resolved_worker_count(), 64);
    }

    #[test]
    fn auto_count_in_range() {
        let count = PoolConfig::default().resolved_worker_count();
        assert!((2..=16).contains(&count), "auto count {count} out of [2,16]");
    }
}
