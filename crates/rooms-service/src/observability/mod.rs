//! Observability: Prometheus metrics and recording helpers.

pub mod metrics;
