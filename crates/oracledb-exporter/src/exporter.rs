//! Collection pass orchestration.
//!
//! A pass opens one connection, probes it, runs every scraper in roster order
//! and records its own health in [`CollectionState`]. Scraper failures are
//! counted per scraper and never abort the pass.

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use oracledb_common::error::{ExporterError, Result};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, warn};

use crate::{
    collectors::{Scraper, default_scrapers},
    db::{Connection, Connector},
    metrics::{Collector, CollectionState, Desc, MetricSink, StateSnapshot, sink},
};

pub const LIVENESS_QUERY: &str = "SELECT 1 FROM DUAL";

pub struct Exporter {
    dsn: String,
    connector: Arc<dyn Connector>,
    state: Arc<CollectionState>,
    scrapers: Vec<Scraper>,
    pass_lock: Mutex<()>,
}

impl Exporter {
    pub fn new(
        dsn: impl Into<String>,
        connector: Arc<dyn Connector>,
        state: Arc<CollectionState>,
    ) -> Self {
        Self::with_scrapers(dsn, connector, state, default_scrapers())
    }

    pub fn with_scrapers(
        dsn: impl Into<String>,
        connector: Arc<dyn Connector>,
        state: Arc<CollectionState>,
        scrapers: Vec<Scraper>,
    ) -> Self {
        Self {
            dsn: dsn.into(),
            connector,
            state,
            scrapers,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }

    /// Runs one pass and emits its samples followed by the exporter's own
    /// health metrics. Concurrent calls run one after another.
    pub async fn collect(&self, sink: &MetricSink) {
        let _pass = self.pass_lock.lock().await;
        self.scrape(sink).await;

        for metric in self.state.collect() {
            if sink.emit(metric).await.is_err() {
                debug!("metric sink closed before exporter state was emitted");
                break;
            }
        }
    }

    /// Learns descriptors by running a real pass.
    ///
    /// Families missing from that pass (no rows, failing scraper, database
    /// down) stay undescribed until a later pass produces them.
    pub async fn describe(&self, descs: &mpsc::Sender<Arc<Desc>>) {
        let (pass_sink, mut receiver) = sink::channel(1);
        let forward = descs.clone();
        let extractor = tokio::spawn(async move {
            while let Some(metric) = receiver.recv().await {
                if forward.send(Arc::clone(metric.desc())).await.is_err() {
                    break;
                }
            }
        });

        self.collect(&pass_sink).await;
        drop(pass_sink);
        if let Err(err) = extractor.await {
            warn!(error = %err, "descriptor extraction task failed");
        }
    }

    async fn scrape(&self, sink: &MetricSink) {
        self.state.total_scrapes.inc();
        let started_at = Instant::now();

        let outcome = self.scrape_database(sink).await;

        let elapsed = started_at.elapsed();
        self.state.duration.set(elapsed.as_secs_f64());
        self.state
            .error
            .set(if outcome.is_err() { 1.0 } else { 0.0 });
        debug!(
            duration_ms = elapsed.as_millis() as u64,
            failed = outcome.is_err(),
            "collection pass finished"
        );
    }

    async fn scrape_database(&self, sink: &MetricSink) -> Result<()> {
        let mut connection = match self.connector.open(&self.dsn).await {
            Ok(connection) => connection,
            Err(err) => {
                error!(error = %err, "error opening connection to database");
                self.state.up.set(0.0);
                return Err(err);
            }
        };

        let outcome = match connection.query(LIVENESS_QUERY).await {
            Ok(_) => {
                self.state.up.set(1.0);
                self.run_scrapers(&mut *connection, sink).await;
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "error pinging oracle");
                self.state.up.set(0.0);
                Err(err)
            }
        };

        if let Err(err) = connection.close().await {
            warn!(error = %err, "error closing database connection");
        }
        outcome
    }

    async fn run_scrapers(&self, connection: &mut dyn Connection, sink: &MetricSink) {
        for scraper in &self.scrapers {
            match (scraper.scrape)(&mut *connection, sink).await {
                Ok(()) => {}
                Err(ExporterError::SinkClosed) => {
                    debug!(
                        collector = scraper.name,
                        "metric sink closed, skipping remaining scrapers"
                    );
                    break;
                }
                Err(err) => {
                    error!(
                        collector = scraper.name,
                        kind = err.kind(),
                        error = %err,
                        "error scraping collector"
                    );
                    self.state.scrape_errors.inc(scraper.name);
                }
            }
        }
    }
}

#[async_trait]
impl Collector for Exporter {
    async fn describe(&self, descs: &mpsc::Sender<Arc<Desc>>) {
        Exporter::describe(self, descs).await;
    }

    async fn collect(&self, sink: &MetricSink) {
        Exporter::collect(self, sink).await;
    }
}
