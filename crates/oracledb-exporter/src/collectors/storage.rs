use futures::future::BoxFuture;
use oracledb_common::{NAMESPACE, error::Result};

use crate::{
    collectors::checked_ratio,
    db::Connection,
    metrics::{Desc, Metric, MetricSink, fq_name, sanitize_name},
};

// Permanent tablespaces from dba_data_files/dba_free_space, unioned with
// temporary ones whose free space comes from gv$sort_segment.
const TABLESPACE_QUERY: &str = r#"
SELECT
  Z.name,
  dt.status,
  dt.contents,
  dt.extent_management,
  Z.bytes,
  Z.max_bytes,
  Z.free_bytes
FROM
(
  SELECT
    X.name                   AS name,
    SUM(nvl(X.free_bytes,0)) AS free_bytes,
    SUM(X.bytes)             AS bytes,
    SUM(X.max_bytes)         AS max_bytes
  FROM
    (
      SELECT
        ddf.tablespace_name AS name,
        ddf.status AS status,
        ddf.bytes AS bytes,
        SUM(dfs.bytes) AS free_bytes,
        CASE
          WHEN ddf.maxbytes = 0 THEN ddf.bytes
          ELSE ddf.maxbytes
        END AS max_bytes
      FROM
        sys.dba_data_files ddf,
        sys.dba_tablespaces dt,
        sys.dba_free_space dfs
      WHERE ddf.tablespace_name = dt.tablespace_name
      AND ddf.file_id = dfs.file_id(+)
      GROUP BY
        ddf.tablespace_name,
        ddf.file_name,
        ddf.status,
        ddf.bytes,
        ddf.maxbytes
    ) X
  GROUP BY X.name
  UNION ALL
  SELECT
    Y.name                   AS name,
    MAX(nvl(Y.free_bytes,0)) AS free_bytes,
    SUM(Y.bytes)             AS bytes,
    SUM(Y.max_bytes)         AS max_bytes
  FROM
    (
      SELECT
        dtf.tablespace_name AS name,
        dtf.status AS status,
        dtf.bytes AS bytes,
        (
          SELECT
            ((f.total_blocks - s.tot_used_blocks)*vp.value)
          FROM
            (SELECT tablespace_name, SUM(used_blocks) tot_used_blocks FROM gv$sort_segment
              WHERE tablespace_name != 'DUMMY' GROUP BY tablespace_name) s,
            (SELECT tablespace_name, SUM(blocks) total_blocks FROM dba_temp_files
              WHERE tablespace_name != 'DUMMY' GROUP BY tablespace_name) f,
            (SELECT value FROM v$parameter WHERE name = 'db_block_size') vp
          WHERE f.tablespace_name = s.tablespace_name AND f.tablespace_name = dtf.tablespace_name
        ) AS free_bytes,
        CASE
          WHEN dtf.maxbytes = 0 THEN dtf.bytes
          ELSE dtf.maxbytes
        END AS max_bytes
      FROM
        sys.dba_temp_files dtf
    ) Y
  GROUP BY Y.name
) Z, sys.dba_tablespaces dt
WHERE
  Z.name = dt.tablespace_name
"#;

const ASM_DISKGROUP_QUERY: &str =
    "SELECT group_number, name, free_mb, total_mb FROM v$asm_diskgroup";

const DATA_FILE_QUERY: &str =
    "SELECT file#, name, status FROM v$datafile WHERE status != 'SYSTEM'";

pub fn scrape_tablespace<'a>(
    conn: &'a mut dyn Connection,
    sink: &'a MetricSink,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let labels = ["tablespace", "type"];
        let bytes_desc = Desc::gauge(
            fq_name(NAMESPACE, "tablespace", "bytes"),
            "Generic counter metric of tablespaces bytes in Oracle.",
            &labels,
        );
        let max_bytes_desc = Desc::gauge(
            fq_name(NAMESPACE, "tablespace", "max_bytes"),
            "Generic counter metric of tablespaces max bytes in Oracle.",
            &labels,
        );
        let free_desc = Desc::gauge(
            fq_name(NAMESPACE, "tablespace", "free"),
            "Generic counter metric of tablespaces free bytes in Oracle.",
            &labels,
        );

        for row in conn.query(TABLESPACE_QUERY).await? {
            let tablespace = row.get_str(0)?;
            let contents = row.get_str(2)?;
            let bytes = row.get_f64(4)?;
            let max_bytes = row.get_f64(5)?;
            let free = row.get_f64(6)?;

            let label_values = [tablespace.as_str(), contents.as_str()];
            sink.emit(Metric::new(&bytes_desc, bytes, &label_values)?).await?;
            sink.emit(Metric::new(&max_bytes_desc, max_bytes, &label_values)?).await?;
            sink.emit(Metric::new(&free_desc, free, &label_values)?).await?;
        }
        Ok(())
    })
}

/// Used fraction of each ASM disk group.
pub fn scrape_asm_disk<'a>(
    conn: &'a mut dyn Connection,
    sink: &'a MetricSink,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let desc = Desc::gauge(
            fq_name(NAMESPACE, "asm", "disk_usage"),
            "asm disk usage",
            &["type", "group_name"],
        );
        for row in conn.query(ASM_DISKGROUP_QUERY).await? {
            let group_number = row.get_str(0)?;
            let name = sanitize_name(&row.get_str(1)?);
            let free_mb = row.get_f64(2)?;
            let total_mb = row.get_f64(3)?;
            let used = 1.0 - checked_ratio(free_mb, total_mb, "asm disk group usage")?;
            sink.emit(Metric::new(&desc, used, &[name.as_str(), group_number.as_str()])?)
                .await?;
        }
        Ok(())
    })
}

pub fn scrape_data_file<'a>(
    conn: &'a mut dyn Connection,
    sink: &'a MetricSink,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let desc = Desc::gauge(
            fq_name(NAMESPACE, "data_file", "status"),
            "data file status",
            &["file", "filename"],
        );
        for row in conn.query(DATA_FILE_QUERY).await? {
            let file = row.get_str(0)?;
            let filename = sanitize_name(&row.get_str(1)?);
            let value = if row.get_str(2)? == "ONLINE" { 1.0 } else { 0.0 };
            sink.emit(Metric::new(&desc, value, &[file.as_str(), filename.as_str()])?)
                .await?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use oracledb_common::ExporterError;

    use super::*;
    use crate::db::testing::{ScriptedConnector, run_scraper, values_of};
    use crate::row;

    #[tokio::test]
    async fn tablespace_emits_three_families_per_row() {
        let connector = ScriptedConnector::new().rows(
            "dba_data_files",
            vec![
                row!["SYSTEM", "ONLINE", "PERMANENT", "LOCAL", 1024.0, 4096.0, 512.0],
                row!["TEMP", "ONLINE", "TEMPORARY", "LOCAL", 2048.0, 2048.0, 2000.0],
            ],
        );

        let (outcome, metrics) = run_scraper(scrape_tablespace, &connector).await;
        outcome.unwrap();
        assert_eq!(metrics.len(), 6);
        assert_eq!(
            values_of(&metrics, "oracledb_tablespace_max_bytes"),
            vec![
                (vec!["SYSTEM".to_string(), "PERMANENT".to_string()], 4096.0),
                (vec!["TEMP".to_string(), "TEMPORARY".to_string()], 2048.0),
            ]
        );
        assert_eq!(
            values_of(&metrics, "oracledb_tablespace_free"),
            vec![
                (vec!["SYSTEM".to_string(), "PERMANENT".to_string()], 512.0),
                (vec!["TEMP".to_string(), "TEMPORARY".to_string()], 2000.0),
            ]
        );
    }

    #[tokio::test]
    async fn asm_disk_usage_uses_sanitized_group_name() {
        let connector = ScriptedConnector::new().rows(
            "v$asm_diskgroup",
            vec![row![1.0, "DATA GROUP", 250.0, 1000.0]],
        );

        let (outcome, metrics) = run_scraper(scrape_asm_disk, &connector).await;
        outcome.unwrap();
        assert_eq!(
            values_of(&metrics, "oracledb_asm_disk_usage"),
            vec![(vec!["data_group".to_string(), "1".to_string()], 0.75)]
        );
    }

    #[tokio::test]
    async fn asm_disk_with_zero_capacity_fails() {
        let connector =
            ScriptedConnector::new().rows("v$asm_diskgroup", vec![row![2.0, "FRA", 0.0, 0.0]]);
        let (outcome, metrics) = run_scraper(scrape_asm_disk, &connector).await;
        assert!(matches!(outcome, Err(ExporterError::DivisionByZero(_))));
        assert!(metrics.is_empty());
    }

    #[tokio::test]
    async fn data_file_status_is_boolean() {
        let connector = ScriptedConnector::new().rows(
            "v$datafile",
            vec![
                row![4.0, "/u01/oradata/users01.dbf", "ONLINE"],
                row![5.0, "/u01/oradata/undo (old).dbf", "OFFLINE"],
            ],
        );

        let (outcome, metrics) = run_scraper(scrape_data_file, &connector).await;
        outcome.unwrap();
        assert_eq!(
            values_of(&metrics, "oracledb_data_file_status"),
            vec![
                (vec!["4".to_string(), "u01oradatausers01.dbf".to_string()], 1.0),
                (vec!["5".to_string(), "u01oradataundo_old.dbf".to_string()], 0.0),
            ]
        );
    }
}
