//! Observability: health probes and Prometheus metrics.

pub mod health;
pub mod metrics;

pub use health::{health_router, READINESS_PROBE_TIMEOUT};
