//! Custom middleware definitions

mod rate_limit;

pub use rate_limit::{KeyedLimiter, RateLimitLayer, keyed_limiter};
