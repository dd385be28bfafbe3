//! Oracle Database metrics exporter core.
//!
//! [`Exporter`] runs collection passes against the database and implements
//! [`Collector`](metrics::Collector); [`MetricsRegistry`](metrics::MetricsRegistry)
//! turns registered collectors into the Prometheus text format.

pub mod collectors;
pub mod db;
pub mod exporter;
pub mod metrics;

pub use exporter::Exporter;
