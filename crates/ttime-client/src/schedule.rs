// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Retry and re-sync timing for long-running acquisition.
//!
//! Failed acquisitions back off exponentially from 1 s by a factor of 5 up
//! to 1 h; a success resets the backoff. Successful acquisitions are
//! repeated on a longer interval between 3 h and 6 h. Both delays are
//! jittered so a fleet of BMCs does not hit the time servers in lockstep.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::TimeConfig;
use crate::consensus::{NtpSource, TrustedTime, acquire_time_with};
use crate::error::TimeError;

/// Exponential backoff with optional jitter.
///
/// The `n`th delay (counting from zero) has the ceiling
/// `min(min * factor^n, max)`. With jitter the delay is drawn uniformly from
/// `[min, ceiling]`; without it the delay is the ceiling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Backoff {
    /// First and smallest delay.
    pub min: Duration,
    /// Largest delay.
    pub max: Duration,
    /// Growth per step.
    pub factor: f64,
    /// Randomise each delay within `[min, ceiling]`.
    pub jitter: bool,
    attempt: u32,
}

impl Backoff {
    /// Delay between failed acquisitions: 1 s growing ×5 to 1 h.
    pub const RETRY: Backoff =
        Backoff::new(Duration::from_secs(1), Duration::from_secs(3600), 5.0);

    /// Delay between successful acquisitions: 3 h growing ×2 to 6 h.
    pub const RESYNC: Backoff = Backoff::new(
        Duration::from_secs(3 * 3600),
        Duration::from_secs(6 * 3600),
        2.0,
    );

    /// A jittered backoff from `min` to `max`.
    pub const fn new(min: Duration, max: Duration, factor: f64) -> Backoff {
        Backoff {
            min,
            max,
            factor,
            jitter: true,
            attempt: 0,
        }
    }

    /// The same backoff with jitter disabled.
    pub const fn without_jitter(mut self) -> Backoff {
        self.jitter = false;
        self
    }

    /// Number of delays drawn since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Start over from `min`.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Upper bound of the `attempt`th delay.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.min.as_secs_f64() * self.factor.powi(exponent);
        if !secs.is_finite() || secs >= self.max.as_secs_f64() {
            return self.max;
        }
        Duration::from_secs_f64(secs.max(0.0)).max(self.min)
    }

    /// Draw the next delay and advance.
    pub fn next(&mut self) -> Duration {
        let ceiling = self.ceiling(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        if !self.jitter || ceiling <= self.min {
            return ceiling;
        }
        let span = (ceiling - self.min).as_nanos().min(u128::from(u64::MAX)) as u64;
        self.min + Duration::from_nanos(rand::random_range(0..=span))
    }
}

/// Drives acquisition for a long-running service.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Schedule {
    /// Backoff after a failed acquisition.
    pub retry: Backoff,
    /// Interval after a successful acquisition.
    pub resync: Backoff,
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule {
            retry: Backoff::RETRY,
            resync: Backoff::RESYNC,
        }
    }
}

impl Schedule {
    /// Acquire time, retrying until it succeeds. Never yields an
    /// unauthenticated time.
    pub async fn acquire_until_success<N>(&mut self, config: &TimeConfig, ntp: &N) -> TrustedTime
    where
        N: NtpSource + ?Sized,
    {
        self.retry_until_success(|| acquire_time_with(config, ntp)).await
    }

    /// Run `attempt` until it succeeds, sleeping a retry delay after each
    /// failure. The retry backoff is reset once it succeeds.
    pub async fn retry_until_success<F, Fut, T>(&mut self, mut attempt: F) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TimeError>>,
    {
        loop {
            match attempt().await {
                Ok(value) => {
                    debug!(failures = self.retry.attempt(), "time acquired");
                    self.retry.reset();
                    return value;
                }
                Err(e) => {
                    let delay = self.retry.next();
                    warn!(error = %e, ?delay, "time acquisition failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// How long to wait before the next periodic acquisition.
    pub fn resync_delay(&mut self) -> Duration {
        self.resync.next()
    }
}
