use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use oracledb_common::error::{ExporterError, Result};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::metrics::{
    collector::Collector,
    sink,
    types::{Desc, Metric, MetricFamily, MetricSample},
};

const HANDOFF_CAPACITY: usize = 64;

pub struct MetricsRegistry {
    collectors: RwLock<Vec<Arc<dyn Collector>>>,
    descriptors: RwLock<BTreeMap<String, Arc<Desc>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            collectors: RwLock::new(Vec::new()),
            descriptors: RwLock::new(BTreeMap::new()),
        }
    }

    /// Describes `collector` and keeps its descriptors. Fails when one of them
    /// clashes with a family already known under the same name.
    pub async fn register(&self, collector: Arc<dyn Collector>) -> Result<()> {
        let (sender, mut receiver) = mpsc::channel::<Arc<Desc>>(HANDOFF_CAPACITY);
        let drain = tokio::spawn(async move {
            let mut described = Vec::new();
            while let Some(desc) = receiver.recv().await {
                described.push(desc);
            }
            described
        });

        collector.describe(&sender).await;
        drop(sender);
        let described = drain
            .await
            .map_err(|err| ExporterError::InternalError(format!("describe task failed: {err}")))?;

        let mut descriptors = self.descriptors.write().map_err(|_| {
            ExporterError::InternalError("failed to acquire metrics registry lock".to_string())
        })?;

        let mut fresh: BTreeMap<String, Arc<Desc>> = BTreeMap::new();
        for desc in described {
            let known = descriptors
                .get(&desc.fq_name)
                .or_else(|| fresh.get(&desc.fq_name));
            match known {
                Some(existing) if !existing.is_compatible(&desc) => {
                    return Err(ExporterError::InvalidArgument(format!(
                        "descriptor {} conflicts with an already registered family",
                        desc.fq_name
                    )));
                }
                Some(_) => {}
                None => {
                    fresh.insert(desc.fq_name.clone(), desc);
                }
            }
        }

        debug!(families = fresh.len(), "registered collector descriptors");
        descriptors.extend(fresh);

        self.collectors
            .write()
            .map_err(|_| {
                ExporterError::InternalError("failed to acquire metrics registry lock".to_string())
            })?
            .push(collector);
        Ok(())
    }

    pub fn descriptors(&self) -> Vec<Arc<Desc>> {
        match self.descriptors.read() {
            Ok(guard) => guard.values().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Runs one collection on every registered collector and groups the
    /// samples into families sorted by name.
    pub async fn gather(&self) -> Vec<MetricFamily> {
        let collectors = match self.collectors.read() {
            Ok(guard) => guard.clone(),
            Err(_) => return Vec::new(),
        };

        let mut families: BTreeMap<String, MetricFamily> = BTreeMap::new();
        for collector in collectors {
            for metric in collect_from(collector.as_ref()).await {
                self.add_to_family(&mut families, metric);
            }
        }

        families.into_values().collect()
    }

    pub async fn render_prometheus(&self) -> String {
        render_families(&self.gather().await)
    }

    fn add_to_family(&self, families: &mut BTreeMap<String, MetricFamily>, metric: Metric) {
        let desc = metric.desc();
        let expected = families
            .get(&desc.fq_name)
            .map(|family| Arc::clone(&family.desc))
            .or_else(|| self.described(&desc.fq_name));

        match expected {
            Some(expected) if !expected.is_compatible(desc) => {
                warn!(
                    metric = %desc.fq_name,
                    "skipping sample whose labels or type differ from the family schema"
                );
                return;
            }
            None => debug!(metric = %desc.fq_name, "collected family was not described"),
            Some(_) => {}
        }

        let sample = MetricSample {
            labels: metric.labels(),
            value: metric.value(),
        };
        families
            .entry(desc.fq_name.clone())
            .or_insert_with(|| MetricFamily {
                desc: Arc::clone(desc),
                samples: Vec::new(),
            })
            .samples
            .push(sample);
    }

    fn described(&self, name: &str) -> Option<Arc<Desc>> {
        self.descriptors.read().ok()?.get(name).cloned()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn collect_from(collector: &dyn Collector) -> Vec<Metric> {
    let (sink, mut receiver) = sink::channel(HANDOFF_CAPACITY);
    let drain = tokio::spawn(async move {
        let mut metrics = Vec::new();
        while let Some(metric) = receiver.recv().await {
            metrics.push(metric);
        }
        metrics
    });

    collector.collect(&sink).await;
    drop(sink);
    match drain.await {
        Ok(metrics) => metrics,
        Err(err) => {
            warn!(error = %err, "metric drain task failed");
            Vec::new()
        }
    }
}

pub fn render_families(families: &[MetricFamily]) -> String {
    let mut output = String::new();

    for family in families {
        output.push_str("# HELP ");
        output.push_str(&family.desc.fq_name);
        output.push(' ');
        output.push_str(&escape_help(&family.desc.help));
        output.push('\n');

        output.push_str("# TYPE ");
        output.push_str(&family.desc.fq_name);
        output.push(' ');
        output.push_str(family.desc.kind.as_prometheus_type());
        output.push('\n');

        for sample in &family.samples {
            output.push_str(&render_sample_line(
                &family.desc.fq_name,
                &sample.labels,
                sample.value,
            ));
        }
    }

    output
}

fn render_sample_line(name: &str, labels: &[(String, String)], value: f64) -> String {
    let mut rendered = String::new();
    rendered.push_str(name);

    if !labels.is_empty() {
        rendered.push('{');
        for (index, (key, value)) in labels.iter().enumerate() {
            if index > 0 {
                rendered.push(',');
            }
            rendered.push_str(key);
            rendered.push_str("=\"");
            rendered.push_str(&escape_label_value(value));
            rendered.push('"');
        }
        rendered.push('}');
    }

    rendered.push(' ');
    rendered.push_str(&format_metric_value(value));
    rendered.push('\n');
    rendered
}

fn format_metric_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn escape_help(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::metrics::sink::MetricSink;

    struct FixedCollector {
        metrics: Vec<Metric>,
    }

    #[async_trait]
    impl Collector for FixedCollector {
        async fn describe(&self, descs: &mpsc::Sender<Arc<Desc>>) {
            for metric in &self.metrics {
                let _ = descs.send(Arc::clone(metric.desc())).await;
            }
        }

        async fn collect(&self, sink: &MetricSink) {
            for metric in &self.metrics {
                let _ = sink.emit(metric.clone()).await;
            }
        }
    }

    #[tokio::test]
    async fn renders_text_exposition_sorted_by_family() {
        let up = Desc::gauge("oracledb_up", "Whether the Oracle database server is up.", &[]);
        let activity = Desc::gauge(
            "oracledb_sessions_activity",
            "Gauge metric with count of sessions by status and type",
            &["status", "type"],
        );
        let registry = MetricsRegistry::new();
        registry
            .register(Arc::new(FixedCollector {
                metrics: vec![
                    Metric::new(&up, 1.0, &[]).unwrap(),
                    Metric::new(&activity, 3.0, &["ACTIVE", "USER"]).unwrap(),
                    Metric::new(&activity, 0.5, &["INACTIVE", "BACK\"GROUND"]).unwrap(),
                ],
            }))
            .await
            .unwrap();

        let output = registry.render_prometheus().await;
        assert_eq!(
            output,
            "# HELP oracledb_sessions_activity \
             Gauge metric with count of sessions by status and type\n\
             # TYPE oracledb_sessions_activity gauge\n\
             oracledb_sessions_activity{status=\"ACTIVE\",type=\"USER\"} 3\n\
             oracledb_sessions_activity{status=\"INACTIVE\",type=\"BACK\\\"GROUND\"} 0.5\n\
             # HELP oracledb_up Whether the Oracle database server is up.\n\
             # TYPE oracledb_up gauge\n\
             oracledb_up 1\n"
        );
        assert_eq!(registry.descriptors().len(), 2);
    }

    struct SilentCollector {
        metrics: Vec<Metric>,
    }

    #[async_trait]
    impl Collector for SilentCollector {
        async fn describe(&self, _descs: &mpsc::Sender<Arc<Desc>>) {}

        async fn collect(&self, sink: &MetricSink) {
            for metric in &self.metrics {
                let _ = sink.emit(metric.clone()).await;
            }
        }
    }

    fn response_time_descs() -> (Arc<Desc>, Arc<Desc>) {
        (
            Desc::gauge("oracledb_response_time", "database response time.", &["type"]),
            Desc::gauge(
                "oracledb_response_time",
                "database response time.",
                &["type", "instance"],
            ),
        )
    }

    #[tokio::test]
    async fn rejects_conflicting_registration() {
        let (narrow, wide) = response_time_descs();
        let registry = MetricsRegistry::new();
        registry
            .register(Arc::new(FixedCollector {
                metrics: vec![Metric::new(&narrow, 1.0, &["cpu"]).unwrap()],
            }))
            .await
            .unwrap();

        let conflicting = FixedCollector {
            metrics: vec![Metric::new(&wide, 2.0, &["cpu", "orcl"]).unwrap()],
        };
        assert!(registry.register(Arc::new(conflicting)).await.is_err());

        let families = registry.gather().await;
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].samples.len(), 1);
    }

    #[tokio::test]
    async fn skips_samples_with_inconsistent_labels() {
        let (narrow, wide) = response_time_descs();
        let registry = MetricsRegistry::new();
        registry
            .register(Arc::new(SilentCollector {
                metrics: vec![
                    Metric::new(&narrow, 1.0, &["cpu"]).unwrap(),
                    Metric::new(&wide, 2.0, &["cpu", "orcl"]).unwrap(),
                    Metric::new(&narrow, 3.0, &["wait"]).unwrap(),
                ],
            }))
            .await
            .unwrap();
        assert!(registry.descriptors().is_empty());

        let families = registry.gather().await;
        assert_eq!(families.len(), 1);
        let values: Vec<f64> = families[0].samples.iter().map(|sample| sample.value).collect();
        assert_eq!(values, vec![1.0, 3.0]);
    }

    #[test]
    fn formats_special_values() {
        assert_eq!(format_metric_value(f64::NAN), "NaN");
        assert_eq!(format_metric_value(f64::INFINITY), "+Inf");
        assert_eq!(format_metric_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_metric_value(42.0), "42");
        assert_eq!(format_metric_value(0.25), "0.25");
    }
}
