//! Dual-leg execution timing (§4.6).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorSettingsConfig {
    pub poll_interval_ms: u64,
    pub total_deadline_ms: u64,
    pub net_timeout_ms: u64,
}
