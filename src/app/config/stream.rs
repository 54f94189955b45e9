//! Price stream polling cadence and per-venue rate limiting.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    pub polling_interval_ms: u64,
    pub per_venue_concurrency: usize,
    #[serde(default = "default_depth")]
    pub depth: u32,
}

fn default_depth() -> u32 {
    10
}
