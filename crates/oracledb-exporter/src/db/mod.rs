pub mod dsn;
#[cfg(feature = "oracle")]
pub mod oracle;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use oracledb_common::error::{ExporterError, Result};

pub use dsn::Dsn;
#[cfg(feature = "oracle")]
pub use oracle::OracleConnector;

/// Opens short-lived connections for one collection pass.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, dsn: &str) -> Result<Box<dyn Connection>>;
}

/// A connection owned by exactly one pass. Dropping it must release the
/// underlying session too; `close` only makes the release observable.
#[async_trait]
pub trait Connection: Send {
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>>;
    async fn close(self: Box<Self>) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get_str(&self, column: usize) -> Result<String> {
        match self.column(column)? {
            Value::Text(text) => Ok(text.clone()),
            Value::Number(number) => Ok(number.to_string()),
            Value::Null => Err(ExporterError::Scan {
                column,
                reason: "converting NULL to string is unsupported".to_string(),
            }),
        }
    }

    pub fn get_f64(&self, column: usize) -> Result<f64> {
        match self.column(column)? {
            Value::Number(number) => Ok(*number),
            Value::Text(text) => text.trim().parse::<f64>().map_err(|err| ExporterError::Scan {
                column,
                reason: format!("converting {text:?} to float: {err}"),
            }),
            Value::Null => Err(ExporterError::Scan {
                column,
                reason: "converting NULL to float is unsupported".to_string(),
            }),
        }
    }

    fn column(&self, column: usize) -> Result<&Value> {
        self.values.get(column).ok_or_else(|| ExporterError::Scan {
            column,
            reason: format!("row has only {} columns", self.values.len()),
        })
    }
}

#[macro_export]
macro_rules! row {
    ($($value:expr),* $(,)?) => {
        $crate::db::Row::new(vec![$($crate::db::Value::from($value)),*])
    };
}
