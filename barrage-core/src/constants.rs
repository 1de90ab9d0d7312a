use std::time::Duration;

/// Concurrent users used when a load test does not set `.concurrency()`
pub const DEFAULT_CONCURRENCY: usize = 50;

/// Requests issued per user for batch runs without `.requests_per_user()`
pub const DEFAULT_REQUESTS_PER_USER: usize = 10;

/// Outstanding requests the sustained scheduler keeps in flight
pub const DEFAULT_POOL_SIZE: usize = 50;

/// Number of error strings kept on a [`PerformanceResult`](crate::PerformanceResult)
pub const MAX_RECORDED_ERRORS: usize = 10;

/// Whole-request timeout applied by the issuer's client
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Idle connections kept per destination host
pub const DEFAULT_POOL_IDLE_PER_HOST: usize = 100;
