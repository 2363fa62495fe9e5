//! Heartbeat configuration.

use std::time::Duration;

use hearth_core::ConfigError;

/// Configuration for a [`Heartbeat`](crate::Heartbeat).
#[derive(Clone, Debug)]
pub struct HeartbeatConfig {
    /// Heartbeats per second. Default: 20.0 (a 50 ms heartbeat).
    pub tick_rate_hz: f64,
    /// Largest delta passed to a single tick, in milliseconds. Time lost
    /// to a stall beyond this is dropped rather than replayed. Default:
    /// 1000.
    pub max_delta_ms: u32,
    /// Name of the heartbeat thread. Default: `"hearth-heartbeat"`.
    pub thread_name: String,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 20.0,
            max_delta_ms: 1000,
            thread_name: "hearth-heartbeat".into(),
        }
    }
}

impl HeartbeatConfig {
    /// Validate all invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // The reciprocal must be finite too: subnormal rates overflow
        // 1.0 / hz and would panic in Duration::from_secs_f64.
        let hz = self.tick_rate_hz;
        if !hz.is_finite() || hz <= 0.0 || Duration::try_from_secs_f64(1.0 / hz).is_err() {
            return Err(ConfigError::InvalidTickRate { value: hz });
        }
        if self.max_delta_ms == 0 {
            return Err(ConfigError::InvalidMaxDelta);
        }
        Ok(())
    }

    /// Wall-clock budget of one heartbeat. Only meaningful on a
    /// validated config.
    pub fn tick_budget(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.tick_rate_hz).unwrap_or(Duration::MAX)
    }
}
