//! Circuit breaker thresholds (§4.5). Cooldowns and the error-rate minimum
//! sample count are not part of the enumerated configuration surface; they
//! are fixed constants here rather than exposed knobs.

use rust_decimal::Decimal;
use serde::Deserialize;

const VOLATILITY_COOLDOWN_MS: i64 = 30_000;
const CONNECTIVITY_COOLDOWN_MS: i64 = 30_000;
const ERROR_RATE_COOLDOWN_MS: i64 = 30_000;
const ERROR_RATE_MIN_SAMPLES: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct BreakersConfig {
    pub volatility_window_ms: i64,
    pub volatility_max_percent: Decimal,
    pub connectivity_failures_to_trip: u32,
    pub error_rate_window: usize,
    pub error_rate_max: Decimal,
}

impl BreakersConfig {
    #[must_use]
    pub fn volatility_cooldown_ms(&self) -> i64 {
        VOLATILITY_COOLDOWN_MS
    }

    #[must_use]
    pub fn connectivity_cooldown_ms(&self) -> i64 {
        CONNECTIVITY_COOLDOWN_MS
    }

    #[must_use]
    pub fn error_rate_cooldown_ms(&self) -> i64 {
        ERROR_RATE_COOLDOWN_MS
    }

    #[must_use]
    pub fn error_rate_min_samples(&self) -> usize {
        ERROR_RATE_MIN_SAMPLES
    }
}
