//! Sub-collectors: one query each, rows mapped to samples.
//!
//! A scraper that fails stops at the failing row. Samples it already emitted
//! stay in the pass.

pub mod cache;
pub mod sessions;
pub mod storage;
pub mod system;

use futures::future::BoxFuture;
use oracledb_common::error::{ExporterError, Result};

use crate::{db::Connection, metrics::MetricSink};

pub type ScrapeFn =
    for<'a> fn(&'a mut dyn Connection, &'a MetricSink) -> BoxFuture<'a, Result<()>>;

/// A named roster entry. The name labels the entry's error counter.
#[derive(Clone, Copy)]
pub struct Scraper {
    pub name: &'static str,
    pub scrape: ScrapeFn,
}

impl Scraper {
    pub const fn new(name: &'static str, scrape: ScrapeFn) -> Self {
        Self { name, scrape }
    }
}

impl std::fmt::Debug for Scraper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scraper").field("name", &self.name).finish()
    }
}

/// Every scraper, in the order a pass runs them.
pub fn default_scrapers() -> Vec<Scraper> {
    vec![
        Scraper::new("activity", system::scrape_activity),
        Scraper::new("tablespace", storage::scrape_tablespace),
        Scraper::new("wait_time", system::scrape_wait_time),
        Scraper::new("sessions", sessions::scrape_sessions),
        Scraper::new("buffer", cache::scrape_buffer_pool),
        Scraper::new("sga", cache::scrape_hit_sga),
        Scraper::new("user_number", system::scrape_user_number),
        Scraper::new("response_time", system::scrape_response_time),
        Scraper::new("asm_disk", storage::scrape_asm_disk),
        Scraper::new("date_file", storage::scrape_data_file),
        Scraper::new("session_wait", sessions::scrape_session_wait),
        Scraper::new("force_log", system::scrape_force_log),
        Scraper::new("session_user", sessions::scrape_session_time),
        Scraper::new("transaction", sessions::scrape_transaction_wait_time),
    ]
}

pub(crate) fn checked_ratio(numerator: f64, denominator: f64, what: &'static str) -> Result<f64> {
    if denominator == 0.0 {
        return Err(ExporterError::DivisionByZero(what));
    }
    Ok(numerator / denominator)
}
