use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Observable breaker position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Commands flow normally
    Closed,
    /// Commands are refused until the reset timeout elapses
    Open,
    /// One probe command is allowed through
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Time spent open before a probe is allowed
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    position: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// Stops hammering the counter store while it is down.
///
/// Closed until `failure_threshold` consecutive failures, then open for
/// `reset_timeout`. After that a single probe is let through; its outcome
/// closes or re-opens the circuit.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState {
                position: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
            config,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        // A poisoned lock only means a panic elsewhere; the counters are still usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> CircuitState {
        let mut state = self.lock();
        self.refresh(&mut state);
        state.position
    }

    /// Whether a command may be issued now. In half-open state only the
    /// first caller gets `true` until an outcome is recorded.
    pub fn allow_request(&self) -> bool {
        let mut state = self.lock();
        self.refresh(&mut state);
        match state.position {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen if state.probe_in_flight => false,
            CircuitState::HalfOpen => {
                state.probe_in_flight = true;
                true
            }
        }
    }

    pub fn record_success(&self) {
        let mut state = self.lock();
        if state.position != CircuitState::Closed {
            tracing::info!("Counter store circuit closed");
        }
        state.position = CircuitState::Closed;
        state.consecutive_failures = 0;
        state.opened_at = None;
        state.probe_in_flight = false;
    }

    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.probe_in_flight = false;

        let trip = match state.position {
            CircuitState::Closed => state.consecutive_failures >= self.config.failure_threshold,
            CircuitState::HalfOpen | CircuitState::Open => true,
        };
        if trip {
            if state.position != CircuitState::Open {
                tracing::warn!(
                    failures = state.consecutive_failures,
                    "Counter store circuit opened"
                );
            }
            state.position = CircuitState::Open;
            state.opened_at = Some(Instant::now());
        }
    }

    fn refresh(&self, state: &mut BreakerState) {
        if state.position != CircuitState::Open {
            return;
        }
        let elapsed = state
            .opened_at
            .map(|opened| opened.elapsed())
            .unwrap_or(self.config.reset_timeout);
        if elapsed >= self.config.reset_timeout {
            state.position = CircuitState::HalfOpen;
            state.probe_in_flight = false;
            tracing::debug!("Counter store circuit half-open");
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
