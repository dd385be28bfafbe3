pub mod error;

pub use error::{ExporterError, Result};

/// Metric namespace shared by every family this exporter emits.
pub const NAMESPACE: &str = "oracledb";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
