//! Policy configuration.
//!
//! - [`RetryOptions`]: backoff and attempt limits for the retry policy
//! - [`TimeLimitOptions`]: overall and per-attempt time budgets

mod retry;
mod time_limit;

pub use retry::{RetryOptions, defaults};
pub use time_limit::TimeLimitOptions;
