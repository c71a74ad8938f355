//! Burst run metrics.

use serde::Serialize;

/// Outcome counts and latency samples for a burst of requests.
#[derive(Debug, Clone, Default)]
pub struct BurstMetrics {
    /// Total requests issued.
    pub total_requests: u64,
    /// Requests that returned rates.
    pub successful_requests: u64,
    /// Requests that failed.
    pub failed_requests: u64,
    /// Latency samples (ms).
    latency_samples: Vec<u64>,
}

impl BurstMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful request.
    pub fn record_success(&mut self, latency_ms: u64) {
        self.total_requests += 1;
        self.successful_requests += 1;
        self.latency_samples.push(latency_ms);
    }

    /// Record a failed request.
    pub fn record_failure(&mut self) {
        self.total_requests += 1;
        self.failed_requests += 1;
    }

    /// Get average latency in ms.
    pub fn average_latency_ms(&self) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let sum: u64 = self.latency_samples.iter().sum();
        sum / self.latency_samples.len() as u64
    }

    pub fn p50_latency_ms(&self) -> u64 {
        self.percentile_latency(50)
    }

    pub fn p99_latency_ms(&self) -> u64 {
        self.percentile_latency(99)
    }

    fn percentile_latency(&self, percentile: usize) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let mut sorted = self.latency_samples.clone();
        sorted.sort_unstable();

        let idx = (sorted.len() * percentile / 100).min(sorted.len() - 1);
        sorted[idx]
    }

    /// Get success rate.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }

        self.successful_requests as f64 / self.total_requests as f64
    }

    /// Snapshot for printing.
    pub fn report(&self) -> BurstReport {
        BurstReport {
            total_requests: self.total_requests,
            successful_requests: self.successful_requests,
            failed_requests: self.failed_requests,
            success_rate: self.success_rate(),
            average_latency_ms: self.average_latency_ms(),
            p50_latency_ms: self.p50_latency_ms(),
            p99_latency_ms: self.p99_latency_ms(),
        }
    }
}

/// Serializable burst summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurstReport {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub average_latency_ms: u64,
    pub p50_latency_ms: u64,
    pub p99_latency_ms: u64,
}
