//! Request pacing for the Trakt client.
//!
//! Two strategies exist and exactly one is active per client:
//! - fixed interval: at most one request every `min_interval` (3 s by default),
//!   regardless of verb;
//! - header driven: back off according to the `X-Ratelimit` descriptor Trakt
//!   attaches to responses, plus a flat pause after every write.
//!
//! The limiter owns its clock so tests can drive it with [`ManualClock`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

pub const RATE_LIMIT_HEADER: &str = "X-Ratelimit";
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(3);
const MODERATE_BACKOFF: Duration = Duration::from_secs(10);
const SEVERE_BACKOFF: Duration = Duration::from_secs(60);
const WRITE_PAUSE: Duration = Duration::from_secs(1);

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `tokio::time`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug)]
struct ManualState {
    now: Instant,
    sleeps: Vec<Duration>,
}

/// Clock that never blocks: `sleep` advances time and records the duration.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<ManualState>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: Instant::now(),
                sleeps: Vec::new(),
            }),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.now += duration;
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).sleeps.clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).now
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.now += duration;
        state.sleeps.push(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingStrategy {
    FixedInterval { min_interval: Duration },
    HeaderDriven,
}

impl PacingStrategy {
    pub fn fixed_interval() -> Self {
        PacingStrategy::FixedInterval {
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

impl Default for PacingStrategy {
    fn default() -> Self {
        Self::fixed_interval()
    }
}

/// Decoded `X-Ratelimit` header, e.g.
/// `{"name":"AUTHED_API_GET_LIMIT","period":300,"limit":1000,"remaining":990,"until":"..."}`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RateLimitDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    pub period: u64,
    pub limit: u64,
    pub remaining: u64,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
}

impl RateLimitDescriptor {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let raw = headers.get(RATE_LIMIT_HEADER)?.to_str().ok()?;
        serde_json::from_str(raw).ok()
    }

    /// Pause demanded by the remaining capacity, if any
    pub fn backoff(&self) -> Option<Duration> {
        if self.limit == 0 {
            return None;
        }
        if self.remaining * 10 < self.limit {
            Some(SEVERE_BACKOFF)
        } else if self.remaining * 4 < self.limit {
            Some(MODERATE_BACKOFF)
        } else {
            None
        }
    }
}

pub struct RateLimiter {
    strategy: PacingStrategy,
    clock: Arc<dyn Clock>,
    last_request: Option<Instant>,
}

impl RateLimiter {
    pub fn new(strategy: PacingStrategy, clock: Arc<dyn Clock>) -> Self {
        Self {
            strategy,
            clock,
            last_request: None,
        }
    }

    /// Wait until the next request may go out, then stamp it.
    pub async fn before_request(&mut self) {
        if let (PacingStrategy::FixedInterval { min_interval }, Some(last)) = (self.strategy, self.last_request) {
            let elapsed = self.clock.now().saturating_duration_since(last);
            if elapsed < min_interval {
                let wait = min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "Pacing Trakt request");
                self.clock.sleep(wait).await;
            }
        }
        self.last_request = Some(self.clock.now());
    }

    /// React to a completed call. `is_read` is true for GET requests.
    pub async fn after_response(&mut self, is_read: bool, descriptor: Option<&RateLimitDescriptor>) {
        if self.strategy != PacingStrategy::HeaderDriven {
            return;
        }

        if let Some(descriptor) = descriptor {
            if let Some(wait) = descriptor.backoff() {
                if wait >= SEVERE_BACKOFF {
                    error!(
                        remaining = descriptor.remaining,
                        limit = descriptor.limit,
                        period = descriptor.period,
                        "Trakt rate limit nearly exhausted, pausing for {}s",
                        wait.as_secs()
                    );
                } else {
                    warn!(
                        remaining = descriptor.remaining,
                        limit = descriptor.limit,
                        period = descriptor.period,
                        "Trakt rate limit running low, pausing for {}s",
                        wait.as_secs()
                    );
                }
                self.clock.sleep(wait).await;
            }
        }

        if !is_read {
            self.clock.sleep(WRITE_PAUSE).await;
        }
    }
}
