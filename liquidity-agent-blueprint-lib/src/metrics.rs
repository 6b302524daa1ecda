//! Lightweight metrics tracker for the liquidity agent.
//!
//! Atomic counters read periodically and logged by the autostake loop.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ErrorKind;

/// Global metrics tracker using atomic counters.
///
/// All counters use relaxed ordering; they are approximate gauges/counters
/// read periodically, so strict ordering isn't needed.
pub struct AgentMetrics {
    /// Script invocations started.
    pub invocations: AtomicU64,
    /// Invocations currently running.
    pub in_flight: AtomicU64,
    /// Cumulative wall-clock time spent in child processes (milliseconds).
    pub total_duration_ms: AtomicU64,
    /// Results with `success: true`.
    pub succeeded: AtomicU64,
    /// Results with `success: false`, whatever the cause.
    pub failed: AtomicU64,
    pub unknown_command: AtomicU64,
    pub invalid_arguments: AtomicU64,
    pub executable_not_found: AtomicU64,
    pub spawn_errors: AtomicU64,
    pub output_parse_errors: AtomicU64,
    pub timeouts: AtomicU64,
    pub unexpected_errors: AtomicU64,
    /// Autostake ticks that submitted a command.
    pub autostake_ticks: AtomicU64,
    /// Replies handed to the outbox.
    pub replies_sent: AtomicU64,
    /// Inbound messages dropped because the envelope did not decode.
    pub messages_dropped: AtomicU64,
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    pub const fn new() -> Self {
        Self {
            invocations: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            total_duration_ms: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            unknown_command: AtomicU64::new(0),
            invalid_arguments: AtomicU64::new(0),
            executable_not_found: AtomicU64::new(0),
            spawn_errors: AtomicU64::new(0),
            output_parse_errors: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            unexpected_errors: AtomicU64::new(0),
            autostake_ticks: AtomicU64::new(0),
            replies_sent: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
        }
    }

    /// Record a finished command and its outcome.
    pub fn record_result(&self, success: bool, kind: Option<ErrorKind>) {
        if success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }

        let counter = match kind {
            Some(ErrorKind::UnknownCommand) => &self.unknown_command,
            Some(ErrorKind::InvalidArguments) => &self.invalid_arguments,
            Some(ErrorKind::ExecutableNotFound) => &self.executable_not_found,
            Some(ErrorKind::SpawnError) => &self.spawn_errors,
            Some(ErrorKind::OutputParseError) => &self.output_parse_errors,
            Some(ErrorKind::Timeout) => &self.timeouts,
            Some(ErrorKind::UnexpectedHandlerError) => &self.unexpected_errors,
            None => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duration(&self, duration_ms: u64) {
        self.total_duration_ms
            .fetch_add(duration_ms, Ordering::Relaxed);
    }

    pub fn record_autostake_tick(&self) {
        self.autostake_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reply(&self) {
        self.replies_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_message(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Start an invocation and return a guard that decrements `in_flight` on drop.
    pub fn invocation_guard(&'static self) -> InvocationGuard {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InvocationGuard(self)
    }

    fn invocation_end(&self) {
        let _ = self
            .in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(1))
            });
    }

    /// Snapshot all metrics as key-value pairs.
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        let invocations = self.invocations.load(Ordering::Relaxed);
        let avg_duration_ms = if invocations > 0 {
            self.total_duration_ms.load(Ordering::Relaxed) / invocations
        } else {
            0
        };

        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        vec![
            ("invocations".into(), invocations),
            ("in_flight".into(), load(&self.in_flight)),
            ("avg_duration_ms".into(), avg_duration_ms),
            ("succeeded".into(), load(&self.succeeded)),
            ("failed".into(), load(&self.failed)),
            ("unknown_command".into(), load(&self.unknown_command)),
            ("invalid_arguments".into(), load(&self.invalid_arguments)),
            ("executable_not_found".into(), load(&self.executable_not_found)),
            ("spawn_errors".into(), load(&self.spawn_errors)),
            ("output_parse_errors".into(), load(&self.output_parse_errors)),
            ("timeouts".into(), load(&self.timeouts)),
            ("unexpected_errors".into(), load(&self.unexpected_errors)),
            ("autostake_ticks".into(), load(&self.autostake_ticks)),
            ("replies_sent".into(), load(&self.replies_sent)),
            ("messages_dropped".into(), load(&self.messages_dropped)),
        ]
    }
}

/// RAII guard that decrements `in_flight` when dropped, including when the
/// waiting future is cancelled.
pub struct InvocationGuard(&'static AgentMetrics);

impl Drop for InvocationGuard {
    fn drop(&mut self) {
        self.0.invocation_end();
    }
}

static METRICS: AgentMetrics = AgentMetrics::new();

/// Returns the global metrics tracker.
pub fn metrics() -> &'static AgentMetrics {
    &METRICS
}
