use std::sync::Arc;

use async_trait::async_trait;
use oracledb_common::error::{ExporterError, Result};
use tracing::debug;

use crate::db::{Connection, Connector, Dsn, Row, Value};

/// Connector backed by the ODPI-C based `oracle` driver. Driver calls block,
/// so each one runs on the blocking pool.
#[derive(Debug, Default, Clone)]
pub struct OracleConnector;

impl OracleConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for OracleConnector {
    async fn open(&self, dsn: &str) -> Result<Box<dyn Connection>> {
        let dsn = Dsn::parse(dsn)?;
        debug!(dsn = %dsn, "opening oracle connection");

        let connection = tokio::task::spawn_blocking(move || {
            ::oracle::Connection::connect(&dsn.username, &dsn.password, &dsn.connect_string)
        })
        .await
        .map_err(|err| ExporterError::InternalError(format!("connect task failed: {err}")))?
        .map_err(|err| ExporterError::Connect(err.to_string()))?;

        Ok(Box::new(OracleConnection {
            inner: Arc::new(connection),
        }))
    }
}

struct OracleConnection {
    inner: Arc<::oracle::Connection>,
}

#[async_trait]
impl Connection for OracleConnection {
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        let connection = Arc::clone(&self.inner);
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || fetch_rows(&connection, &sql))
            .await
            .map_err(|err| ExporterError::InternalError(format!("query task failed: {err}")))?
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let connection = self.inner;
        tokio::task::spawn_blocking(move || connection.close())
            .await
            .map_err(|err| ExporterError::InternalError(format!("close task failed: {err}")))?
            .map_err(|err| ExporterError::Connect(err.to_string()))
    }
}

fn fetch_rows(connection: &::oracle::Connection, sql: &str) -> Result<Vec<Row>> {
    let result_set = connection
        .query(sql, &[])
        .map_err(|err| ExporterError::Query(err.to_string()))?;

    let mut rows = Vec::new();
    for fetched in result_set {
        let fetched = fetched.map_err(|err| ExporterError::Query(err.to_string()))?;
        let mut values = Vec::with_capacity(fetched.sql_values().len());
        for column in 0..fetched.sql_values().len() {
            let value: Option<String> =
                fetched
                    .get(column)
                    .map_err(|err| ExporterError::Scan {
                        column,
                        reason: err.to_string(),
                    })?;
            values.push(Value::from(value));
        }
        rows.push(Row::new(values));
    }

    Ok(rows)
}
