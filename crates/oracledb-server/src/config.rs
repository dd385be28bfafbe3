use clap::Parser;
use oracledb_common::error::{ExporterError, Result};

pub const DSN_ENV: &str = "DATA_SOURCE_NAME";

#[derive(Parser, Debug)]
#[command(name = "oracledb_exporter", version, about = "Prometheus exporter for Oracle Database")]
pub struct Cli {
    /// Address to listen on for web interface and telemetry.
    #[arg(long = "web.listen-address", default_value = ":9161")]
    pub listen_address: String,

    /// Path under which to expose metrics.
    #[arg(long = "web.telemetry-path", default_value = "/metrics")]
    pub telemetry_path: String,
}

impl Cli {
    /// A bare `:port` binds every interface.
    pub fn bind_address(&self) -> String {
        let address = self.listen_address.trim();
        if address.starts_with(':') {
            format!("0.0.0.0{address}")
        } else {
            address.to_string()
        }
    }

    pub fn metrics_path(&self) -> String {
        let path = self.telemetry_path.trim();
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        }
    }
}

pub fn data_source_name() -> Result<String> {
    match std::env::var(DSN_ENV) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ExporterError::InvalidDsn(format!("{DSN_ENV} is not set"))),
    }
}
