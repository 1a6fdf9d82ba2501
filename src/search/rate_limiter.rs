// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-provider throttling
//!
//! Two independent brakes: a local governor quota and a cooldown window set
//! when the provider itself answers "rate limited".

use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovRateLimiter};
use std::num::NonZeroU32;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{ResearchError, Result};

const DEFAULT_RPM: NonZeroU32 = match NonZeroU32::new(60) {
    Some(rpm) => rpm,
    None => panic!("60 is non-zero"),
};

/// Rate limiter and cooldown state for one provider
pub struct ProviderThrottle {
    limiter: GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    requests_per_minute: u32,
    cooldown_until: Mutex<Option<Instant>>,
}

impl ProviderThrottle {
    /// Create a throttle allowing `requests_per_minute` calls
    ///
    /// Zero falls back to 60.
    pub fn new(requests_per_minute: u32) -> Self {
        let rpm = NonZeroU32::new(requests_per_minute).unwrap_or(DEFAULT_RPM);
        let limiter = GovRateLimiter::direct(Quota::per_minute(rpm));

        Self {
            limiter,
            requests_per_minute: rpm.get(),
            cooldown_until: Mutex::new(None),
        }
    }

    /// Remaining cooldown, if the provider is currently benched
    pub fn cooling_down(&self) -> Option<Duration> {
        let mut guard = self.cooldown_until.lock().unwrap_or_else(|e| e.into_inner());
        match *guard {
            Some(until) => {
                let now = Instant::now();
                if now >= until {
                    *guard = None;
                    None
                } else {
                    Some(until - now)
                }
            }
            None => None,
        }
    }

    /// Bench the provider for `duration`; an existing longer window is kept
    pub fn start_cooldown(&self, duration: Duration) {
        let until = Instant::now() + duration;
        let mut guard = self.cooldown_until.lock().unwrap_or_else(|e| e.into_inner());
        match *guard {
            Some(existing) if existing >= until => {}
            _ => *guard = Some(until),
        }
    }

    /// Take one unit of the local quota
    ///
    /// Returns `RateLimited` when the quota is exhausted.
    pub fn check(&self) -> Result<()> {
        match self.limiter.check() {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(DefaultClock::default().now());
                Err(ResearchError::RateLimited {
                    retry_after_secs: wait.as_secs().max(1),
                })
            }
        }
    }

    /// Get the configured requests per minute
    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }
}
