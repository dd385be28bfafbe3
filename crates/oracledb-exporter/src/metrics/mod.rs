pub mod collector;
pub mod registry;
pub mod sanitize;
pub mod sink;
pub mod state;
pub mod types;

pub use collector::Collector;
pub use registry::MetricsRegistry;
pub use sanitize::sanitize_name;
pub use sink::MetricSink;
pub use state::{CollectionState, StateSnapshot};
pub use types::{Desc, Metric, MetricFamily, MetricSample, ValueKind, fq_name};
