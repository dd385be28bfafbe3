mod config;
mod handlers;
mod router;

use std::sync::Arc;

use clap::Parser;
use oracledb_common::VERSION;
use oracledb_exporter::{
    Exporter,
    db::Connector,
    metrics::{CollectionState, MetricsRegistry},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    config::Cli,
    router::{ServerState, exporter_router},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("oracledb_server=info".parse()?)
        .add_directive("oracledb_exporter=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    info!("starting oracledb_exporter {VERSION}");

    let dsn = config::data_source_name()?;
    let exporter = Arc::new(Exporter::new(
        dsn,
        database_connector()?,
        Arc::new(CollectionState::new()),
    ));

    let registry = Arc::new(MetricsRegistry::new());
    registry.register(exporter).await?;
    info!(
        families = registry.descriptors().len(),
        "registered oracle exporter"
    );

    let metrics_path = cli.metrics_path();
    let state = Arc::new(ServerState::new(registry, &metrics_path));
    let app = exporter_router(state, &metrics_path);

    let addr = cli.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}, metrics at {metrics_path}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "oracle")]
fn database_connector() -> Result<Arc<dyn Connector>, Box<dyn std::error::Error>> {
    Ok(Arc::new(oracledb_exporter::db::OracleConnector::new()))
}

#[cfg(not(feature = "oracle"))]
fn database_connector() -> Result<Arc<dyn Connector>, Box<dyn std::error::Error>> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "built without a database driver; rebuild with `--features oracle`",
    )
    .into())
}
