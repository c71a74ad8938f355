//! Per-destination circuit breaker.
//!
//! The circuit has three states:
//!
//! - **Closed**: calls go through; consecutive transient failures are counted.
//! - **Open**: calls fail fast with [`FxError::CircuitOpen`] until the break
//!   duration has elapsed.
//! - **HalfOpen**: a single trial call is let through. Its success closes the
//!   circuit, a transient failure opens it again for a full break.
//!
//! Only transient failures count. Permanent failures leave the count alone.
//!
//! Every opening starts a new generation. Outcomes from permits issued in an
//! earlier generation cannot close, reopen or free the trial slot of a newer
//! open/half-open cycle.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{FxError, FxResult};

const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

const DEFAULT_BREAK_DURATION: Duration = Duration::from_secs(30);

/// Circuit breaker state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// Aggregate result of one guarded call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CallOutcome {
    Success,
    TransientFailure,
    PermanentFailure,
}

impl CallOutcome {
    pub fn of<T>(result: &FxResult<T>) -> Self {
        match result {
            Ok(_) => CallOutcome::Success,
            Err(e) if e.is_transient() => CallOutcome::TransientFailure,
            Err(_) => CallOutcome::PermanentFailure,
        }
    }
}

#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    generation: u64,
}

impl Circuit {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            opened_at: None,
            trial_in_flight: false,
            generation: 0,
        }
    }

    fn open(&mut self) {
        self.state = CircuitState::Open;
        self.opened_at = Some(Instant::now());
        self.trial_in_flight = false;
        self.generation += 1;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.opened_at = None;
        self.trial_in_flight = false;
    }
}

/// Circuit breaker configuration.
#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive transient failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls.
    pub break_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            break_duration: DEFAULT_BREAK_DURATION,
        }
    }
}

/// Circuit breaker tracking one circuit per destination.
pub struct CircuitBreaker {
    circuits: Mutex<HashMap<String, Circuit>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            circuits: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Ask to make a call to `destination`.
    ///
    /// Fails with [`FxError::CircuitOpen`] while the circuit is open, and
    /// while a half-open trial is already in flight. The returned permit must
    /// be completed with the call's outcome; a permit dropped without
    /// completion gives its trial slot back.
    pub fn try_acquire(&self, destination: &str) -> FxResult<CallPermit<'_>> {
        let mut circuits = self.circuits.lock();
        let circuit = circuits
            .entry(destination.to_string())
            .or_insert_with(Circuit::new);

        let trial = match circuit.state {
            CircuitState::Closed => false,
            CircuitState::Open => {
                let elapsed = circuit
                    .opened_at
                    .map(|opened_at| opened_at.elapsed())
                    .unwrap_or(self.config.break_duration);

                if elapsed < self.config.break_duration {
                    return Err(self.rejection(destination));
                }

                info!(destination, "Circuit breaker: Open -> HalfOpen");
                circuit.state = CircuitState::HalfOpen;
                circuit.trial_in_flight = true;
                true
            }
            CircuitState::HalfOpen => {
                if circuit.trial_in_flight {
                    return Err(self.rejection(destination));
                }
                circuit.trial_in_flight = true;
                true
            }
        };

        Ok(CallPermit {
            breaker: self,
            destination: destination.to_string(),
            trial,
            generation: circuit.generation,
            completed: false,
        })
    }

    /// Get the current state for a destination.
    pub fn state(&self, destination: &str) -> CircuitState {
        self.circuits
            .lock()
            .get(destination)
            .map(|c| c.state)
            .unwrap_or(CircuitState::Closed)
    }

    /// Get the consecutive transient failure count for a destination.
    pub fn failure_count(&self, destination: &str) -> u32 {
        self.circuits
            .lock()
            .get(destination)
            .map(|c| c.failure_count)
            .unwrap_or(0)
    }

    fn rejection(&self, destination: &str) -> FxError {
        debug!(destination, "Circuit breaker: rejecting call");
        FxError::CircuitOpen {
            destination: destination.to_string(),
        }
    }

    fn record(&self, permit: &CallPermit<'_>, outcome: CallOutcome) {
        let mut circuits = self.circuits.lock();
        let circuit = circuits
            .entry(permit.destination.clone())
            .or_insert_with(Circuit::new);
        let destination = permit.destination.as_str();

        // A permit from an earlier cycle only matters while the circuit is closed
        if permit.generation != circuit.generation && circuit.state != CircuitState::Closed {
            debug!(destination, "Circuit breaker: ignoring outcome from earlier cycle");
            return;
        }

        match outcome {
            CallOutcome::Success => {
                if circuit.state != CircuitState::Closed {
                    info!(destination, "Circuit breaker: closing circuit");
                }
                circuit.close();
            }
            CallOutcome::TransientFailure => match circuit.state {
                CircuitState::Closed => {
                    circuit.failure_count += 1;
                    if circuit.failure_count >= self.config.failure_threshold {
                        info!(
                            destination,
                            failures = circuit.failure_count,
                            "Circuit breaker: opening circuit"
                        );
                        circuit.open();
                    } else {
                        debug!(
                            destination,
                            failures = circuit.failure_count,
                            threshold = self.config.failure_threshold,
                            "Circuit breaker: transient failure"
                        );
                    }
                }
                CircuitState::HalfOpen => {
                    info!(destination, "Circuit breaker: trial failed, reopening circuit");
                    circuit.open();
                }
                CircuitState::Open => {}
            },
            CallOutcome::PermanentFailure => {
                if permit.trial && circuit.state == CircuitState::HalfOpen {
                    circuit.trial_in_flight = false;
                }
            }
        }
    }

    fn release_trial(&self, permit: &CallPermit<'_>) {
        let mut circuits = self.circuits.lock();
        if let Some(circuit) = circuits.get_mut(&permit.destination) {
            if circuit.state == CircuitState::HalfOpen && circuit.generation == permit.generation {
                circuit.trial_in_flight = false;
            }
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

/// Permission to make one guarded call.
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    destination: String,
    trial: bool,
    generation: u64,
    completed: bool,
}

impl CallPermit<'_> {
    /// Whether this call is the half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    /// Report the aggregate outcome of the call.
    pub fn complete(mut self, outcome: CallOutcome) {
        self.completed = true;
        self.breaker.record(&self, outcome);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.completed && self.trial {
            self.breaker.release_trial(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEST: &str = "frankfurter:latest";

    fn fail(cb: &CircuitBreaker, times: usize) {
        for _ in 0..times {
            cb.try_acquire(DEST)
                .unwrap()
                .complete(CallOutcome::TransientFailure);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_circuit_starts_closed() {
        let cb = CircuitBreaker::new();

        assert!(cb.try_acquire(DEST).is_ok());
        assert_eq!(cb.state(DEST), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_circuit_opens_after_threshold() {
        let cb = CircuitBreaker::new();

        fail(&cb, 2);
        assert_eq!(cb.state(DEST), CircuitState::Closed);
        assert_eq!(cb.failure_count(DEST), 2);

        fail(&cb, 1);
        assert_eq!(cb.state(DEST), CircuitState::Open);
        assert!(matches!(
            cb.try_acquire(DEST),
            Err(FxError::CircuitOpen { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failure_count() {
        let cb = CircuitBreaker::new();

        fail(&cb, 2);
        cb.try_acquire(DEST).unwrap().complete(CallOutcome::Success);

        assert_eq!(cb.failure_count(DEST), 0);
        fail(&cb, 2);
        assert_eq!(cb.state(DEST), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failures_do_not_count() {
        let cb = CircuitBreaker::new();

        for _ in 0..5 {
            cb.try_acquire(DEST)
                .unwrap()
                .complete(CallOutcome::PermanentFailure);
        }

        assert_eq!(cb.failure_count(DEST), 0);
        assert_eq!(cb.state(DEST), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_allows_single_trial() {
        let cb = CircuitBreaker::new();
        fail(&cb, 3);

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(cb.try_acquire(DEST).is_err());

        tokio::time::advance(Duration::from_secs(1)).await;
        let trial = cb.try_acquire(DEST).unwrap();
        assert!(trial.is_trial());
        assert_eq!(cb.state(DEST), CircuitState::HalfOpen);

        // A second caller is rejected while the trial is in flight
        assert!(matches!(
            cb.try_acquire(DEST),
            Err(FxError::CircuitOpen { .. })
        ));

        trial.complete(CallOutcome::Success);
        assert_eq!(cb.state(DEST), CircuitState::Closed);
        assert_eq!(cb.failure_count(DEST), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_trial_reopens_for_full_break() {
        let cb = CircuitBreaker::new();
        fail(&cb, 3);

        tokio::time::advance(Duration::from_secs(30)).await;
        cb.try_acquire(DEST)
            .unwrap()
            .complete(CallOutcome::TransientFailure);
        assert_eq!(cb.state(DEST), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(cb.try_acquire(DEST).is_err());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cb.try_acquire(DEST).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_trial_releases_slot() {
        let cb = CircuitBreaker::new();
        fail(&cb, 3);
        tokio::time::advance(Duration::from_secs(30)).await;

        drop(cb.try_acquire(DEST).unwrap());

        assert_eq!(cb.state(DEST), CircuitState::HalfOpen);
        assert!(cb.try_acquire(DEST).unwrap().is_trial());
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_trial_failure_keeps_half_open() {
        let cb = CircuitBreaker::new();
        fail(&cb, 3);
        tokio::time::advance(Duration::from_secs(30)).await;

        cb.try_acquire(DEST)
            .unwrap()
            .complete(CallOutcome::PermanentFailure);

        assert_eq!(cb.state(DEST), CircuitState::HalfOpen);
        assert!(cb.try_acquire(DEST).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_count_stops_at_threshold() {
        let cb = CircuitBreaker::new();

        let permits: Vec<_> = (0..5).map(|_| cb.try_acquire(DEST).unwrap()).collect();
        for permit in permits {
            permit.complete(CallOutcome::TransientFailure);
        }
        assert_eq!(cb.state(DEST), CircuitState::Open);
        assert_eq!(cb.failure_count(DEST), 3);

        tokio::time::advance(Duration::from_secs(30)).await;
        cb.try_acquire(DEST)
            .unwrap()
            .complete(CallOutcome::TransientFailure);
        assert_eq!(cb.state(DEST), CircuitState::Open);
        assert_eq!(cb.failure_count(DEST), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_failure_cannot_free_trial_slot() {
        let cb = CircuitBreaker::new();

        // Admitted while closed, finishes long after the circuit opened
        let slow = cb.try_acquire(DEST).unwrap();
        fail(&cb, 3);

        tokio::time::advance(Duration::from_secs(30)).await;
        let trial = cb.try_acquire(DEST).unwrap();
        assert!(trial.is_trial());

        slow.complete(CallOutcome::TransientFailure);
        assert_eq!(cb.state(DEST), CircuitState::HalfOpen);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(matches!(
            cb.try_acquire(DEST),
            Err(FxError::CircuitOpen { .. })
        ));

        // Only the trial itself can give its slot back
        drop(trial);
        let next = cb.try_acquire(DEST).unwrap();
        assert!(next.is_trial());
        assert!(cb.try_acquire(DEST).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_success_does_not_close_half_open_circuit() {
        let cb = CircuitBreaker::new();

        let slow = cb.try_acquire(DEST).unwrap();
        let slow_permanent = cb.try_acquire(DEST).unwrap();
        fail(&cb, 3);

        tokio::time::advance(Duration::from_secs(30)).await;
        let trial = cb.try_acquire(DEST).unwrap();

        slow.complete(CallOutcome::Success);
        slow_permanent.complete(CallOutcome::PermanentFailure);
        assert_eq!(cb.state(DEST), CircuitState::HalfOpen);
        assert!(cb.try_acquire(DEST).is_err());

        trial.complete(CallOutcome::Success);
        assert_eq!(cb.state(DEST), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_outcome_counts_once_closed_again() {
        let cb = CircuitBreaker::new();

        let slow = cb.try_acquire(DEST).unwrap();
        fail(&cb, 3);
        tokio::time::advance(Duration::from_secs(30)).await;
        cb.try_acquire(DEST).unwrap().complete(CallOutcome::Success);

        slow.complete(CallOutcome::TransientFailure);
        assert_eq!(cb.state(DEST), CircuitState::Closed);
        assert_eq!(cb.failure_count(DEST), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destination_isolation() {
        let cb = CircuitBreaker::new();
        fail(&cb, 3);

        assert!(cb.try_acquire(DEST).is_err());
        assert!(cb.try_acquire("frankfurter:history").is_ok());
        assert_eq!(cb.state("frankfurter:history"), CircuitState::Closed);
    }

    #[test]
    fn test_call_outcome_classification() {
        assert_eq!(CallOutcome::of(&Ok::<_, FxError>(1)), CallOutcome::Success);
        assert_eq!(
            CallOutcome::of::<()>(&Err(FxError::transient("src", "HTTP 503"))),
            CallOutcome::TransientFailure
        );
        assert_eq!(
            CallOutcome::of::<()>(&Err(FxError::RateNotFound("USD".into()))),
            CallOutcome::PermanentFailure
        );
    }
}
