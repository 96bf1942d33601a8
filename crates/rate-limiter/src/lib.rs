//! Process- and restart-safe token-bucket governor over expensive remote
//! operations. Backed by a single SQLite table so every process sharing the
//! database file observes the same token counts.

mod error;
mod limiter;

pub use error::{Error, Result};
pub use limiter::RateLimiter;
