use futures::future::BoxFuture;
use oracledb_common::{NAMESPACE, error::Result};

use crate::{
    collectors::checked_ratio,
    db::Connection,
    metrics::{Desc, Metric, MetricSink, fq_name, sanitize_name},
};

const BUFFER_POOL_QUERY: &str = "SELECT name, physical_reads, db_block_gets, consistent_gets \
     FROM v$buffer_pool_statistics";

const LIBRARY_CACHE_QUERY: &str = "SELECT SUM(pinhits), SUM(pins) FROM v$librarycache";

/// Hit ratio per buffer pool: `1 - physical_reads / (db_block_gets + consistent_gets)`.
pub fn scrape_buffer_pool<'a>(
    conn: &'a mut dyn Connection,
    sink: &'a MetricSink,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let desc = Desc::gauge(
            fq_name(NAMESPACE, "buffer", "hits"),
            "buffer hits percentage.",
            &["table"],
        );
        for row in conn.query(BUFFER_POOL_QUERY).await? {
            let name = sanitize_name(&row.get_str(0)?);
            let physical_reads = row.get_f64(1)?;
            let logical_reads = row.get_f64(2)? + row.get_f64(3)?;
            let hit_ratio =
                1.0 - checked_ratio(physical_reads, logical_reads, "buffer pool hit ratio")?;
            sink.emit(Metric::new(&desc, hit_ratio, &[name.as_str()])?).await?;
        }
        Ok(())
    })
}

pub fn scrape_hit_sga<'a>(
    conn: &'a mut dyn Connection,
    sink: &'a MetricSink,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let desc = Desc::gauge(fq_name(NAMESPACE, "sga", "hits"), "sga hits percentage.", &[]);
        for row in conn.query(LIBRARY_CACHE_QUERY).await? {
            let hit_ratio =
                checked_ratio(row.get_f64(0)?, row.get_f64(1)?, "library cache hit ratio")?;
            sink.emit(Metric::new(&desc, hit_ratio, &[])?).await?;
        }
        Ok(())
    })
}
