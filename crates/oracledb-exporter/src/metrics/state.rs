use std::{
    collections::BTreeMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use oracledb_common::NAMESPACE;
use tracing::warn;

use crate::metrics::types::{Desc, Metric, fq_name};

const EXPORTER_SUBSYSTEM: &str = "exporter";

pub struct Counter {
    desc: Arc<Desc>,
    value: AtomicU64,
}

impl Counter {
    fn new(desc: Arc<Desc>) -> Self {
        Self {
            desc,
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    fn collect(&self) -> Option<Metric> {
        Metric::new(&self.desc, self.get() as f64, &[]).ok()
    }
}

/// f64 gauge stored as raw bits so reads never need a lock.
pub struct Gauge {
    desc: Arc<Desc>,
    bits: AtomicU64,
}

impl Gauge {
    fn new(desc: Arc<Desc>) -> Self {
        Self {
            desc,
            bits: AtomicU64::new(0_f64.to_bits()),
        }
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    fn collect(&self) -> Option<Metric> {
        Metric::new(&self.desc, self.get(), &[]).ok()
    }
}

/// Counter with a single variable label. Series appear on first increment.
pub struct CounterVec {
    desc: Arc<Desc>,
    series: RwLock<BTreeMap<String, Arc<AtomicU64>>>,
}

impl CounterVec {
    fn new(desc: Arc<Desc>) -> Self {
        Self {
            desc,
            series: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn inc(&self, label_value: &str) {
        self.get_or_create_series(label_value)
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, label_value: &str) -> Option<u64> {
        let guard = self.series.read().ok()?;
        guard
            .get(label_value)
            .map(|value| value.load(Ordering::Relaxed))
    }

    pub fn values(&self) -> BTreeMap<String, u64> {
        match self.series.read() {
            Ok(guard) => guard
                .iter()
                .map(|(label, value)| (label.clone(), value.load(Ordering::Relaxed)))
                .collect(),
            Err(_) => BTreeMap::new(),
        }
    }

    fn get_or_create_series(&self, label_value: &str) -> Arc<AtomicU64> {
        if let Ok(guard) = self.series.read()
            && let Some(existing) = guard.get(label_value)
        {
            return existing.clone();
        }

        match self.series.write() {
            Ok(mut guard) => guard
                .entry(label_value.to_string())
                .or_insert_with(|| Arc::new(AtomicU64::new(0)))
                .clone(),
            Err(_) => {
                warn!(label = label_value, "counter series lock poisoned");
                Arc::new(AtomicU64::new(0))
            }
        }
    }

    fn collect(&self) -> Vec<Metric> {
        self.values()
            .into_iter()
            .filter_map(|(label, value)| Metric::new(&self.desc, value as f64, &[&label]).ok())
            .collect()
    }
}

/// Health of the exporter itself, updated once per pass.
pub struct CollectionState {
    pub duration: Gauge,
    pub error: Gauge,
    pub total_scrapes: Counter,
    pub scrape_errors: CounterVec,
    pub up: Gauge,
}

impl CollectionState {
    pub fn new() -> Self {
        Self {
            duration: Gauge::new(Desc::gauge(
                fq_name(NAMESPACE, EXPORTER_SUBSYSTEM, "last_scrape_duration_seconds"),
                "Duration of the last scrape of metrics from Oracle DB.",
                &[],
            )),
            total_scrapes: Counter::new(Desc::counter(
                fq_name(NAMESPACE, EXPORTER_SUBSYSTEM, "scrapes_total"),
                "Total number of times Oracle DB was scraped for metrics.",
                &[],
            )),
            scrape_errors: CounterVec::new(Desc::counter(
                fq_name(NAMESPACE, EXPORTER_SUBSYSTEM, "scrape_errors_total"),
                "Total number of times an error occurred scraping an Oracle database.",
                &["collector"],
            )),
            error: Gauge::new(Desc::gauge(
                fq_name(NAMESPACE, EXPORTER_SUBSYSTEM, "last_scrape_error"),
                "Whether the last scrape of metrics from Oracle DB resulted in an error \
                 (1 for error, 0 for success).",
                &[],
            )),
            up: Gauge::new(Desc::gauge(
                fq_name(NAMESPACE, "", "up"),
                "Whether the Oracle database server is up.",
                &[],
            )),
        }
    }

    /// Current values in emission order: duration, scrapes, error flag,
    /// per-collector errors, up.
    pub fn collect(&self) -> Vec<Metric> {
        let mut metrics = Vec::new();
        metrics.extend(self.duration.collect());
        metrics.extend(self.total_scrapes.collect());
        metrics.extend(self.error.collect());
        metrics.extend(self.scrape_errors.collect());
        metrics.extend(self.up.collect());
        metrics
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            last_duration_seconds: self.duration.get(),
            last_error: self.error.get() != 0.0,
            total_scrapes: self.total_scrapes.get(),
            scrape_errors: self.scrape_errors.values(),
            up: self.up.get() != 0.0,
        }
    }
}

impl Default for CollectionState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub last_duration_seconds: f64,
    pub last_error: bool,
    pub total_scrapes: u64,
    pub scrape_errors: BTreeMap<String, u64>,
    pub up: bool,
}
