use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use oracledb_common::error::{ExporterError, Result};

use crate::{
    collectors::ScrapeFn,
    db::{Connection, Connector, Row},
    metrics::{Metric, sink},
};

#[derive(Clone)]
enum Reply {
    Rows(Vec<Row>),
    Fail,
}

/// Answers queries by matching a SQL fragment. Unmatched queries return no
/// rows.
#[derive(Clone, Default)]
pub(crate) struct ScriptedConnector {
    refuse_open: bool,
    replies: Vec<(&'static str, Reply)>,
    pub opens: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    pub queries: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing() -> Self {
        Self {
            refuse_open: true,
            ..Self::default()
        }
    }

    pub fn rows(mut self, fragment: &'static str, rows: Vec<Row>) -> Self {
        self.replies.push((fragment, Reply::Rows(rows)));
        self
    }

    /// Failures take precedence over rows scripted for the same fragment.
    pub fn fail(mut self, fragment: &'static str) -> Self {
        self.replies.insert(0, (fragment, Reply::Fail));
        self
    }

    pub fn connection(&self) -> ScriptedConnection {
        ScriptedConnection {
            replies: self.replies.clone(),
            closes: Arc::clone(&self.closes),
            queries: Arc::clone(&self.queries),
        }
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(&self, _dsn: &str) -> Result<Box<dyn Connection>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.refuse_open {
            return Err(ExporterError::Connect("ORA-12541: TNS:no listener".to_string()));
        }
        Ok(Box::new(self.connection()))
    }
}

pub(crate) struct ScriptedConnection {
    replies: Vec<(&'static str, Reply)>,
    closes: Arc<AtomicUsize>,
    queries: Arc<AtomicUsize>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .iter()
            .find(|(fragment, _)| sql.contains(fragment))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Fail) => Err(ExporterError::Query(format!(
                "ORA-00942: table or view does not exist: {}",
                sql.trim()
            ))),
            None => Ok(Vec::new()),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Runs one scraper against `connector` and returns its outcome together
/// with every sample it emitted.
pub(crate) async fn run_scraper(
    scrape: ScrapeFn,
    connector: &ScriptedConnector,
) -> (Result<()>, Vec<Metric>) {
    let (sink, mut receiver) = sink::channel(1);
    let drain = tokio::spawn(async move {
        let mut metrics = Vec::new();
        while let Some(metric) = receiver.recv().await {
            metrics.push(metric);
        }
        metrics
    });

    let mut connection = connector.connection();
    let outcome = scrape(&mut connection, &sink).await;
    drop(sink);
    let metrics = drain.await.expect("drain task");
    (outcome, metrics)
}

pub(crate) fn values_of(metrics: &[Metric], fq_name: &str) -> Vec<(Vec<String>, f64)> {
    metrics
        .iter()
        .filter(|metric| metric.desc().fq_name == fq_name)
        .map(|metric| (metric.label_values().to_vec(), metric.value()))
        .collect()
}
