//! Sliding-window attempt limiter with lazy lockout expiry.
//!
//! Two states: open, and locked out until a timestamp. There is no timer;
//! every query compares against the caller's "now".

use crate::config::RedemptionConfig;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Persisted limiter state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    /// Recorded attempts, oldest first.
    #[serde(default)]
    pub attempts: Vec<DateTime<Utc>>,
    /// End of the active lockout, if any.
    #[serde(default)]
    pub locked_until: Option<DateTime<Utc>>,
}

/// Counts attempts in a trailing window and locks out when the threshold is
/// reached.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_attempts: usize,
    window: Duration,
    lockout: Duration,
    attempts: VecDeque<DateTime<Utc>>,
    locked_until: Option<DateTime<Utc>>,
}

impl RateLimiter {
    /// Creates an open limiter.
    #[must_use]
    pub fn new(config: &RedemptionConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            window: config.attempt_window(),
            lockout: config.lockout(),
            attempts: VecDeque::new(),
            locked_until: None,
        }
    }

    /// Rebuilds a limiter from persisted state.
    #[must_use]
    pub fn restore(config: &RedemptionConfig, snapshot: &RateLimitSnapshot) -> Self {
        let mut limiter = Self::new(config);
        let mut attempts = snapshot.attempts.clone();
        attempts.sort();
        limiter.attempts = attempts.into();
        limiter.locked_until = snapshot.locked_until;
        limiter
    }

    /// Returns the persistable state.
    #[must_use]
    pub fn snapshot(&self) -> RateLimitSnapshot {
        RateLimitSnapshot {
            attempts: self.attempts.iter().copied().collect(),
            locked_until: self.locked_until,
        }
    }

    /// Returns true while a lockout is active. Clears an expired lockout.
    pub fn is_locked_out(&mut self, now: DateTime<Utc>) -> bool {
        match self.locked_until {
            Some(until) if now < until => true,
            Some(_) => {
                self.locked_until = None;
                false
            }
            None => false,
        }
    }

    /// End of the lockout, if one was set and not yet cleared.
    #[must_use]
    pub fn locked_until(&self) -> Option<DateTime<Utc>> {
        self.locked_until
    }

    /// Time left on the active lockout.
    #[must_use]
    pub fn remaining_lockout(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.locked_until
            .filter(|until| now < *until)
            .map(|until| until - now)
    }

    /// Records an attempt at `now`.
    ///
    /// Old attempts are pruned before the threshold check, so a burst that
    /// has aged out of the window never causes a lockout. Returns true if
    /// this attempt started a lockout.
    pub fn record_attempt(&mut self, now: DateTime<Utc>) -> bool {
        self.attempts.push_back(now);
        self.prune(now);

        let already_locked = self.locked_until.is_some_and(|until| now < until);
        if self.attempts.len() >= self.max_attempts && !already_locked {
            self.locked_until = Some(now + self.lockout);
            return true;
        }
        false
    }

    /// Attempts currently inside the window.
    #[must_use]
    pub fn attempts_in_window(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        self.attempts.iter().filter(|t| **t > cutoff).count()
    }

    /// Clears all state.
    pub fn reset(&mut self) {
        self.attempts.clear();
        self.locked_until = None;
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        while self.attempts.front().is_some_and(|t| *t <= cutoff) {
            self.attempts.pop_front();
        }
    }
}
