//! # Utility Modules
//!
//! Supporting utilities for logging and observability.
//!
//! ## Components
//! - **Logging**: `tracing-subscriber` setup from configuration
//! - **Metrics**: per-pool atomic counters and an operation timer

pub mod logging;
pub mod metrics;

pub use metrics::{Metrics, MetricsSnapshot};
