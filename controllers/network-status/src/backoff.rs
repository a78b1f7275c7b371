//! # Fibonacci Backoff
//!
//! Requeue delay after a failed reconcile. With a 1s minimum the sequence is
//! 1s, 1s, 2s, 3s, 5s, 8s, ... up to the configured maximum. Each object
//! keeps its own sequence until it reconciles successfully.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Fibonacci backoff calculator, in whole seconds
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_seconds: u64,
    prev_seconds: u64,
    current_seconds: u64,
    max_seconds: u64,
}

impl FibonacciBackoff {
    /// Backoff starting at `min_seconds` and capped at `max_seconds`
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            min_seconds,
            prev_seconds: 0,
            current_seconds: min_seconds,
            max_seconds,
        }
    }

    /// Returns the current delay and advances the sequence
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_seconds;
        let next = self.prev_seconds.saturating_add(self.current_seconds);
        self.prev_seconds = self.current_seconds;
        self.current_seconds = next.min(self.max_seconds);
        Duration::from_secs(delay)
    }

    /// Back to the first delay, after the watch made progress
    pub fn reset(&mut self) {
        self.prev_seconds = 0;
        self.current_seconds = self.min_seconds;
    }
}

/// Fibonacci backoff per object key
#[derive(Debug)]
pub struct RetryBackoff {
    min_seconds: u64,
    max_seconds: u64,
    objects: Mutex<HashMap<String, FibonacciBackoff>>,
}

impl RetryBackoff {
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            min_seconds,
            max_seconds,
            objects: Mutex::new(HashMap::new()),
        }
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<String, FibonacciBackoff>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delay before retrying `key` after another failure
    pub fn next_delay(&self, key: &str) -> Duration {
        self.objects()
            .entry(key.to_string())
            .or_insert_with(|| FibonacciBackoff::new(self.min_seconds, self.max_seconds))
            .next_delay()
    }

    /// Forgets the failures of `key`
    pub fn reset(&self, key: &str) {
        self.objects().remove(key);
    }
}
