//! Built-in policies.
//!
//! - [`RetryFactory`]: resends on HTTP 503 and transient errors with capped
//!   exponential backoff
//! - [`TimeLimitFactory`]: bounds the cumulative time of all attempts
//! - [`LoggingFactory`]: logs one entry/exit pair per attempt
//! - [`HeaderFactory`]: sets fixed headers on every attempt

mod header;
mod logging;
mod retry;
mod time_limit;

pub use header::HeaderFactory;
pub use logging::{Logger, LoggingFactory, TracingLogger};
pub use retry::RetryFactory;
pub use time_limit::TimeLimitFactory;
