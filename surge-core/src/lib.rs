#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod rate_limiter;

pub use config::{GeneratorConfig, SourceConfig};
pub use error::{SurgeError, SurgeResult};
pub use rate_limiter::RateLimiter;
