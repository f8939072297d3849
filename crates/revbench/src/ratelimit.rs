//! Submission rate limiting
//!
//! A token bucket shared by all workers. Each operation takes one token right
//! before dispatch; when the bucket is empty the caller reserves the next
//! token and sleeps until it is due, so waiters are served in arrival order.
//!
//! # Example
//! ```rust,ignore
//! use revbench::ratelimit::TokenBucket;
//!
//! // 100 operations per second, no bursts
//! let limiter = TokenBucket::per_second(100);
//! limiter.wait().await;
//! ```

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Token bucket rate limiter
pub struct TokenBucket {
    /// Tokens per second; `None` is unlimited
    rate: Option<f64>,
    capacity: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug, Clone)]
struct BucketState {
    /// May go negative: outstanding reservations
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    /// Create a limiter with the given rate and burst capacity
    pub fn new(rate: u64, capacity: u32) -> Self {
        let rate = if rate == 0 || rate == u64::MAX {
            None
        } else {
            Some(rate as f64)
        };
        let capacity = capacity.max(1) as f64;
        Self {
            rate,
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_update: Instant::now(),
            }),
        }
    }

    /// Create with rate per second and a burst of one
    pub fn per_second(rate: u64) -> Self {
        Self::new(rate, 1)
    }

    /// Limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(u64::MAX, 1)
    }

    pub fn is_unlimited(&self) -> bool {
        self.rate.is_none()
    }

    fn refill(&self, rate: f64, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_update).as_secs_f64();
        state.tokens = (state.tokens + elapsed * rate).min(self.capacity);
        state.last_update = now;
    }

    /// Take a token, or reserve the next one and return how long to wait for it
    async fn reserve(&self) -> Duration {
        let Some(rate) = self.rate else {
            return Duration::ZERO;
        };
        let mut state = self.state.lock().await;
        self.refill(rate, &mut state);
        state.tokens -= 1.0;
        if state.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-state.tokens / rate)
        }
    }

    /// Take a token if one is available now
    pub async fn try_acquire(&self) -> bool {
        let Some(rate) = self.rate else {
            return true;
        };
        let mut state = self.state.lock().await;
        self.refill(rate, &mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Wait until a token is available and take it
    pub async fn wait(&self) {
        let delay = self.reserve().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
