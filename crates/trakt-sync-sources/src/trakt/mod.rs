pub mod api;
pub mod client;
pub mod http;
pub mod pacing;
pub mod pagination;

pub use client::TraktClient;
pub use http::{TraktCredentials, TraktHttp, TraktResponse, DEFAULT_BASE_URL};
pub use pacing::{Clock, ManualClock, PacingStrategy, RateLimitDescriptor, RateLimiter, TokioClock};
pub use pagination::{PageInfo, PageState, Paginator, DEFAULT_PAGE_SIZE};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use super::http::{TraktCredentials, TraktHttp};
    use super::pacing::{ManualClock, PacingStrategy, RateLimiter};

    /// Client pointed at a mock server, paced by a clock that never blocks
    pub(crate) fn test_http(base_url: &str, strategy: PacingStrategy) -> (TraktHttp, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::new(strategy, clock.clone());
        let credentials = TraktCredentials {
            client_id: "client-123".to_string(),
            access_token: "token-abc".to_string(),
        };
        let http = TraktHttp::new(base_url, credentials, None, limiter).unwrap();
        (http, clock)
    }
}
