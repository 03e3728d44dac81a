//! Policies governing per-target sends.

mod backoff;
mod retry;

pub use backoff::calculate_retry_delay;
pub use retry::RetryPolicy;
