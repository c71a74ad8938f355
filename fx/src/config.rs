//! Exchange-rate access configuration.

use std::time::Duration;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::policy::{CurrencyPolicy, DEFAULT_DENIED_CURRENCIES};
use crate::resilience::{ResilienceConfig, RetryPolicy};

/// Default upstream base address.
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.frankfurter.dev/v1";

/// Main configuration.
#[derive(Debug, Clone)]
pub struct FxConfig {
    /// Upstream base address.
    pub upstream_base_url: String,
    /// Cache TTL in minutes, shared by all queries.
    pub cache_ttl_minutes: u32,
    /// Timeout for each upstream attempt.
    pub request_timeout: Duration,
    /// Retry configuration.
    pub retry: RetryPolicy,
    /// Circuit breaker configuration.
    pub breaker: CircuitBreakerConfig,
    /// Currencies refused by conversions.
    pub denied_currencies: Vec<String>,
    /// If set, the only currencies conversions accept.
    pub allowed_currencies: Option<Vec<String>>,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            upstream_base_url: DEFAULT_UPSTREAM_URL.to_string(),
            cache_ttl_minutes: 10,
            request_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            breaker: CircuitBreakerConfig::default(),
            denied_currencies: DEFAULT_DENIED_CURRENCIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            allowed_currencies: None,
        }
    }
}

impl FxConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from `lookup`, keeping defaults for missing or
    /// unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("EXRATE_UPSTREAM_URL") {
            config.upstream_base_url = url;
        }

        if let Some(ttl) = lookup("EXRATE_CACHE_TTL_MINUTES") {
            if let Ok(ttl) = ttl.parse() {
                config.cache_ttl_minutes = ttl;
            }
        }

        if let Some(secs) = lookup("EXRATE_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.request_timeout = Duration::from_secs(secs);
            }
        }

        if let Some(retries) = lookup("EXRATE_MAX_RETRIES") {
            if let Ok(retries) = retries.parse() {
                config.retry.max_retries = retries;
            }
        }

        if let Some(threshold) = lookup("EXRATE_BREAKER_THRESHOLD") {
            if let Ok(threshold) = threshold.parse() {
                config.breaker.failure_threshold = threshold;
            }
        }

        if let Some(secs) = lookup("EXRATE_BREAKER_BREAK_SECS") {
            if let Ok(secs) = secs.parse() {
                config.breaker.break_duration = Duration::from_secs(secs);
            }
        }

        if let Some(denied) = lookup("EXRATE_DENIED_CURRENCIES") {
            config.denied_currencies = split_codes(&denied);
        }

        if let Some(allowed) = lookup("EXRATE_ALLOWED_CURRENCIES") {
            let allowed = split_codes(&allowed);
            if !allowed.is_empty() {
                config.allowed_currencies = Some(allowed);
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.upstream_base_url.trim().is_empty() {
            return Err("Upstream base URL cannot be empty".to_string());
        }

        if self.cache_ttl_minutes == 0 {
            return Err("Cache TTL must be at least one minute".to_string());
        }

        if self.request_timeout.is_zero() {
            return Err("Request timeout cannot be 0".to_string());
        }

        if self.breaker.failure_threshold == 0 {
            return Err("Breaker failure threshold cannot be 0".to_string());
        }

        Ok(())
    }

    /// Cache TTL as a wall-clock duration.
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.cache_ttl_minutes))
    }

    pub fn resilience(&self) -> ResilienceConfig {
        ResilienceConfig {
            retry: self.retry.clone(),
            breaker: self.breaker.clone(),
            attempt_timeout: self.request_timeout,
        }
    }

    pub fn policy(&self) -> CurrencyPolicy {
        let policy = CurrencyPolicy::with_denied(&self.denied_currencies);
        match &self.allowed_currencies {
            Some(allowed) => policy.with_allowed(allowed),
            None => policy,
        }
    }
}

fn split_codes(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_uppercase)
        .collect()
}
