//! Configuration types for eyes-dl

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-attempt retry policy around a single HTTP dispatch
///
/// Applied by the attempt executor to every request it sends. This is a
/// fixed-interval policy: the escalating delay schedule for polling a
/// long-running server job is configured separately in [`LongRequestConfig`].
///
/// The defaults (one retry, no delay before it) are part of the public
/// contract — callers needing different durability must override them
/// explicitly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Number of retries after a failed dispatch (default: 1)
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Fixed sleep before each retry when enabled (default: 500ms)
    #[serde(default = "default_retry_interval", with = "duration_ms_serde")]
    pub retry_interval: Duration,

    /// Whether to sleep `retry_interval` before retrying (default: false)
    #[serde(default)]
    pub delay_before_retry: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            retry_interval: default_retry_interval(),
            delay_before_retry: false,
        }
    }
}

/// Polling schedule for asynchronous server jobs (202 Accepted)
///
/// The delay is recomputed as `min(max_delay_secs, floor(delay * backoff_factor))`
/// *before* every poll, so the first poll already sleeps `initial * factor`
/// seconds (3s with defaults), and the sequence 2→3→4→6→9→10 stabilizes at
/// `max_delay_secs`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LongRequestConfig {
    /// Starting value of the delay accumulator in seconds (default: 2)
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,

    /// Cap on the delay between polls in seconds (default: 10)
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,

    /// Multiplier applied to the previous delay before each poll (default: 1.5)
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

impl Default for LongRequestConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: default_initial_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

/// Main configuration for [`TestResultsHandler`](crate::TestResultsHandler)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Per-attempt retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Polling schedule for long requests
    #[serde(default)]
    pub long_request: LongRequestConfig,

    /// Whole-request timeout applied to the underlying HTTP client
    /// (None = no timeout; default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "optional_duration_serde")]
    pub request_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            long_request: LongRequestConfig::default(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_retries() -> u32 {
    1
}

fn default_retry_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_initial_delay_secs() -> u64 {
    2
}

fn default_max_delay_secs() -> u64 {
    10
}

fn default_backoff_factor() -> f64 {
    1.5
}

fn default_request_timeout() -> Option<Duration> {
    Some(Duration::from_secs(30))
}

// Duration serialization helper (milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Optional Duration serialization helper (seconds)
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
