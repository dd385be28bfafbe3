use oracledb_common::error::{ExporterError, Result};
use tokio::sync::mpsc;

use crate::metrics::types::Metric;

/// Sending half of a collection pass. Every emitted sample goes through here.
#[derive(Debug, Clone)]
pub struct MetricSink {
    sender: mpsc::Sender<Metric>,
}

impl MetricSink {
    pub fn new(sender: mpsc::Sender<Metric>) -> Self {
        Self { sender }
    }

    pub async fn emit(&self, metric: Metric) -> Result<()> {
        self.sender
            .send(metric)
            .await
            .map_err(|_| ExporterError::SinkClosed)
    }
}

pub fn channel(capacity: usize) -> (MetricSink, mpsc::Receiver<Metric>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (MetricSink::new(sender), receiver)
}
