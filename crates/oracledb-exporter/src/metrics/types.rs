use std::sync::Arc;

use oracledb_common::error::{ExporterError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Counter,
    Gauge,
}

impl ValueKind {
    pub fn as_prometheus_type(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
        }
    }
}

/// Static schema of one metric family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Desc {
    pub fq_name: String,
    pub help: String,
    pub label_keys: Vec<String>,
    pub kind: ValueKind,
}

impl Desc {
    pub fn new(
        fq_name: impl Into<String>,
        help: &str,
        label_keys: &[&str],
        kind: ValueKind,
    ) -> Arc<Self> {
        Arc::new(Self {
            fq_name: fq_name.into(),
            help: help.to_string(),
            label_keys: label_keys.iter().map(|key| (*key).to_string()).collect(),
            kind,
        })
    }

    pub fn gauge(fq_name: impl Into<String>, help: &str, label_keys: &[&str]) -> Arc<Self> {
        Self::new(fq_name, help, label_keys, ValueKind::Gauge)
    }

    pub fn counter(fq_name: impl Into<String>, help: &str, label_keys: &[&str]) -> Arc<Self> {
        Self::new(fq_name, help, label_keys, ValueKind::Counter)
    }

    /// Two descriptors describe the same family shape when their label keys
    /// and kind agree. Help text is not compared.
    pub fn is_compatible(&self, other: &Desc) -> bool {
        self.fq_name == other.fq_name
            && self.label_keys == other.label_keys
            && self.kind == other.kind
    }
}

/// One observation of a family: label values follow `desc.label_keys` order.
#[derive(Debug, Clone)]
pub struct Metric {
    desc: Arc<Desc>,
    label_values: Vec<String>,
    value: f64,
}

impl Metric {
    pub fn new(desc: &Arc<Desc>, value: f64, label_values: &[&str]) -> Result<Self> {
        if label_values.len() != desc.label_keys.len() {
            return Err(ExporterError::LabelCardinality {
                name: desc.fq_name.clone(),
                expected: desc.label_keys.len(),
                actual: label_values.len(),
            });
        }

        Ok(Self {
            desc: Arc::clone(desc),
            label_values: label_values.iter().map(|value| (*value).to_string()).collect(),
            value,
        })
    }

    pub fn desc(&self) -> &Arc<Desc> {
        &self.desc
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn labels(&self) -> Vec<(String, String)> {
        self.desc
            .label_keys
            .iter()
            .zip(self.label_values.iter())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct MetricSample {
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct MetricFamily {
    pub desc: Arc<Desc>,
    pub samples: Vec<MetricSample>,
}

/// Joins non-empty name segments with `_`.
pub fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|segment| !segment.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}
