//! Configuration structures that can be tested independently
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_URL: &str = "http://192.168.1.100:3000/check-alarm";
pub const DEFAULT_DEVICE_ID: &str = "esp32_alarm_001";

/// Every timer the poller runs on, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    pub poll_interval_ms: u32,
    /// Polling is suppressed this long after a positive result.
    pub cooldown_ms: u32,
    /// How long the annunciator stays on after a trigger.
    pub alarm_duration_ms: u32,
    pub request_timeout_ms: u32,
    /// Visual indicator blink period; on for the first half.
    pub blink_period_ms: u32,
    /// Minimum spacing of the "next check in" status line.
    pub status_log_interval_ms: u32,
    pub loop_delay_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            cooldown_ms: 5 * 60 * 1_000,
            alarm_duration_ms: 15_000,
            request_timeout_ms: 10_000,
            blink_period_ms: 1_000,
            status_log_interval_ms: 15_000,
            loop_delay_ms: 100,
        }
    }
}

/// Bounded reconnect policy: fixed backoff, fixed attempt cap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            backoff_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Upper bound on how long a full reconnect can block.
    pub fn worst_case_ms(&self) -> u64 {
        self.max_attempts as u64 * self.backoff_ms as u64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointConfig {
    pub server_url: String,
    pub device_id: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            device_id: DEFAULT_DEVICE_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    pub wifi_ssid: String,
    #[serde(skip_serializing, default)]
    pub wifi_password: String,
}

impl NetworkConfig {
    /// Password presence marker for logs; the password itself is never printed.
    pub fn password_marker(&self) -> &'static str {
        if self.wifi_password.is_empty() {
            "<empty>"
        } else {
            "<set>"
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PollerConfig {
    pub timing: TimingConfig,
    pub retry: RetryPolicy,
    pub endpoint: EndpointConfig,
    pub network: NetworkConfig,
}

impl PollerConfig {
    pub fn validate(&self) -> Result<()> {
        let t = &self.timing;
        if t.poll_interval_ms == 0 {
            bail!("poll interval must be non-zero");
        }
        if t.blink_period_ms == 0 {
            bail!("blink period must be non-zero");
        }
        if t.cooldown_ms < t.alarm_duration_ms {
            bail!(
                "cooldown ({} ms) must not be shorter than the alarm duration ({} ms)",
                t.cooldown_ms,
                t.alarm_duration_ms
            );
        }
        if self.retry.max_attempts == 0 {
            bail!("retry policy needs at least one attempt");
        }
        if self.endpoint.server_url.is_empty() {
            bail!("server URL cannot be empty");
        }
        if self.endpoint.device_id.is_empty() {
            bail!("device id cannot be empty");
        }
        Ok(())
    }
}
