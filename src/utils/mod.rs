//! # Utility Modules
//!
//! Supporting utilities for logging, metrics and timing.
//!
//! ## Components
//! - **Logging**: tracing-subscriber setup from [`crate::config::LoggingConfig`]
//! - **Metrics**: Thread-safe observability counters
//! - **Timeout**: Optional async timeout wrappers for blocking receives

pub mod logging;
pub mod metrics;
pub mod timeout;

pub use metrics::{Metrics, MetricsSnapshot};
