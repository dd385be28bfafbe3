use futures::future::BoxFuture;
use oracledb_common::{NAMESPACE, error::Result};

use crate::{
    db::Connection,
    metrics::{Desc, Metric, MetricSink, fq_name},
};

const SESSIONS_QUERY: &str = "SELECT status, type, COUNT(*) FROM v$session GROUP BY status, type";

// Background sessions in the history have no username.
const SESSION_WAIT_QUERY: &str = "SELECT s.sid, NVL(s.username, ' '), \
     SUM(ash.wait_time + ash.time_waited) total_wait_time \
     FROM v$active_session_history ash, v$session s \
     WHERE ash.session_id = s.sid \
     GROUP BY s.sid, s.username \
     ORDER BY total_wait_time DESC";

const SESSION_TIME_QUERY: &str = "SELECT username, NVL(terminal, ' '), NVL(program, ' '), \
     ROUND((SYSDATE - logon_time) * (24 * 60 * 60), 1) AS seconds_logged_on, \
     ROUND(last_call_et, 1) AS seconds_for_current_sql \
     FROM v$session \
     WHERE status = 'ACTIVE' AND username IS NOT NULL \
     ORDER BY seconds_logged_on DESC";

const TRANSACTION_WAIT_QUERY: &str = "SELECT sid, event, blocking_session, last_call_et \
     FROM v$session \
     WHERE status = 'ACTIVE' AND blocking_session IS NOT NULL";

/// Session counts by status and type, plus the deprecated per-status totals
/// kept so existing dashboards keep working.
pub fn scrape_sessions<'a>(
    conn: &'a mut dyn Connection,
    sink: &'a MetricSink,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let activity_desc = Desc::gauge(
            fq_name(NAMESPACE, "sessions", "activity"),
            "Gauge metric with count of sessions by status and type",
            &["status", "type"],
        );

        let mut active = 0.0;
        let mut inactive = 0.0;
        for row in conn.query(SESSIONS_QUERY).await? {
            let status = row.get_str(0)?;
            let session_type = row.get_str(1)?;
            let count = row.get_f64(2)?;
            sink.emit(Metric::new(
                &activity_desc,
                count,
                &[status.as_str(), session_type.as_str()],
            )?)
            .await?;

            match status.as_str() {
                "ACTIVE" => active += count,
                "INACTIVE" => inactive += count,
                _ => {}
            }
        }

        let active_desc = Desc::gauge(
            fq_name(NAMESPACE, "sessions", "active"),
            "Gauge metric with count of sessions marked ACTIVE. \
             DEPRECATED: use sum(oracledb_sessions_activity{status='ACTIVE'}) instead.",
            &[],
        );
        let inactive_desc = Desc::gauge(
            fq_name(NAMESPACE, "sessions", "inactive"),
            "Gauge metric with count of sessions marked INACTIVE. \
             DEPRECATED: use sum(oracledb_sessions_activity{status='INACTIVE'}) instead.",
            &[],
        );
        sink.emit(Metric::new(&active_desc, active, &[])?).await?;
        sink.emit(Metric::new(&inactive_desc, inactive, &[])?).await?;
        Ok(())
    })
}

pub fn scrape_session_wait<'a>(
    conn: &'a mut dyn Connection,
    sink: &'a MetricSink,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let desc = Desc::gauge(
            fq_name(NAMESPACE, "session", "wait_second"),
            "session wait second",
            &["sid", "username"],
        );
        for row in conn.query(SESSION_WAIT_QUERY).await? {
            let sid = row.get_str(0)?;
            let username = row.get_str(1)?;
            let value = row.get_f64(2)?;
            sink.emit(Metric::new(&desc, value, &[sid.as_str(), username.as_str()])?)
                .await?;
        }
        Ok(())
    })
}

/// Logged-on time and current statement time of active, named sessions.
pub fn scrape_session_time<'a>(
    conn: &'a mut dyn Connection,
    sink: &'a MetricSink,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let labels = ["username", "terminal", "program"];
        let logged_desc = Desc::gauge(
            fq_name(NAMESPACE, "sessions", "logged_time"),
            "logged time unit second",
            &labels,
        );
        let sql_desc = Desc::gauge(
            fq_name(NAMESPACE, "sessions", "sql_time"),
            "current sql time unit second",
            &labels,
        );

        for row in conn.query(SESSION_TIME_QUERY).await? {
            let username = row.get_str(0)?;
            let terminal = row.get_str(1)?;
            let program = row.get_str(2)?;
            let logged_on = row.get_f64(3)?;
            let current_sql = row.get_f64(4)?;

            let label_values = [username.as_str(), terminal.as_str(), program.as_str()];
            sink.emit(Metric::new(&logged_desc, logged_on, &label_values)?).await?;
            sink.emit(Metric::new(&sql_desc, current_sql, &label_values)?).await?;
        }
        Ok(())
    })
}

pub fn scrape_transaction_wait_time<'a>(
    conn: &'a mut dyn Connection,
    sink: &'a MetricSink,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let desc = Desc::gauge(
            fq_name(NAMESPACE, "transaction", "wait_time"),
            "transaction wait time",
            &["sid", "event", "blocking_session"],
        );
        for row in conn.query(TRANSACTION_WAIT_QUERY).await? {
            let sid = row.get_str(0)?;
            let event = row.get_str(1)?;
            let blocking_session = row.get_str(2)?;
            let elapsed = row.get_f64(3)?;
            sink.emit(Metric::new(
                &desc,
                elapsed,
                &[sid.as_str(), event.as_str(), blocking_session.as_str()],
            )?)
            .await?;
        }
        Ok(())
    })
}
