use futures::future::BoxFuture;
use oracledb_common::{NAMESPACE, error::Result};

use crate::{
    collectors::checked_ratio,
    db::Connection,
    metrics::{Desc, Metric, MetricSink, fq_name, sanitize_name},
};

const ACTIVITY_QUERY: &str = "SELECT name, value FROM v$sysstat \
     WHERE name IN ('parse count (total)', 'execute count', 'user commits', 'user rollbacks')";

const WAIT_TIME_QUERY: &str = "SELECT n.wait_class, m.time_waited, m.intsize_csec \
     FROM v$waitclassmetric m, v$system_wait_class n \
     WHERE m.wait_class_id = n.wait_class_id AND n.wait_class != 'Idle'";

const USER_NUMBER_QUERY: &str = "SELECT COUNT(1) FROM dba_users";

const RESPONSE_TIME_QUERY: &str = "SELECT metric_name, value FROM sys.v_$sysmetric \
     WHERE metric_name IN ('Database CPU Time Ratio', 'Database Wait Time Ratio') \
     AND intsize_csec = (SELECT MAX(intsize_csec) FROM sys.v_$sysmetric)";

const FORCE_LOG_QUERY: &str = "SELECT force_logging FROM v$database";

/// Counters from v$sysstat, one family per statistic.
pub fn scrape_activity<'a>(
    conn: &'a mut dyn Connection,
    sink: &'a MetricSink,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        for row in conn.query(ACTIVITY_QUERY).await? {
            let name = sanitize_name(&row.get_str(0)?);
            let value = row.get_f64(1)?;
            let desc = Desc::counter(
                fq_name(NAMESPACE, "activity", &name),
                "Generic counter metric from v$sysstat view in Oracle.",
                &[],
            );
            sink.emit(Metric::new(&desc, value, &[])?).await?;
        }
        Ok(())
    })
}

/// Average active sessions per wait class over the last metric interval.
pub fn scrape_wait_time<'a>(
    conn: &'a mut dyn Connection,
    sink: &'a MetricSink,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        for row in conn.query(WAIT_TIME_QUERY).await? {
            let name = sanitize_name(&row.get_str(0)?);
            let time_waited = row.get_f64(1)?;
            let interval = row.get_f64(2)?;
            let value =
                round_to_millis(checked_ratio(time_waited, interval, "wait time per interval")?);
            let desc = Desc::counter(
                fq_name(NAMESPACE, "wait_time", &name),
                "Generic counter metric from v$waitclassmetric view in Oracle.",
                &[],
            );
            sink.emit(Metric::new(&desc, value, &[])?).await?;
        }
        Ok(())
    })
}

pub fn scrape_user_number<'a>(
    conn: &'a mut dyn Connection,
    sink: &'a MetricSink,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let desc = Desc::gauge(fq_name(NAMESPACE, "user", "number"), "user number.", &[]);
        for row in conn.query(USER_NUMBER_QUERY).await? {
            sink.emit(Metric::new(&desc, row.get_f64(0)?, &[])?).await?;
        }
        Ok(())
    })
}

pub fn scrape_response_time<'a>(
    conn: &'a mut dyn Connection,
    sink: &'a MetricSink,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let desc = Desc::gauge(
            fq_name(NAMESPACE, "response", "time"),
            "database response time.",
            &["type"],
        );
        for row in conn.query(RESPONSE_TIME_QUERY).await? {
            let name = sanitize_name(&row.get_str(0)?);
            let value = row.get_f64(1)?;
            sink.emit(Metric::new(&desc, value, &[name.as_str()])?).await?;
        }
        Ok(())
    })
}

pub fn scrape_force_log<'a>(
    conn: &'a mut dyn Connection,
    sink: &'a MetricSink,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let desc = Desc::gauge(fq_name(NAMESPACE, "force", "log"), "force log", &[]);
        for row in conn.query(FORCE_LOG_QUERY).await? {
            let value = if row.get_str(0)? == "YES" { 1.0 } else { 0.0 };
            sink.emit(Metric::new(&desc, value, &[])?).await?;
        }
        Ok(())
    })
}

fn round_to_millis(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
