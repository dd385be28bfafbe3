use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::metrics::{sink::MetricSink, types::Desc};

/// Two-phase protocol consumed by [`MetricsRegistry`](crate::metrics::MetricsRegistry).
///
/// `describe` is called once at registration, `collect` on every scrape. Both
/// may be called concurrently from several requests.
#[async_trait]
pub trait Collector: Send + Sync {
    async fn describe(&self, descs: &mpsc::Sender<Arc<Desc>>);
    async fn collect(&self, sink: &MetricSink);
}
