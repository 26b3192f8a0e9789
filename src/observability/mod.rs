//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! client / cache / resilience / auth produce:
//!     → logging.rs (structured events, one span per invocation)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stderr via tracing-subscriber (binary only)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
