use std::sync::Arc;

use axum::{Router, routing::get};
use oracledb_common::VERSION;
use oracledb_exporter::metrics::MetricsRegistry;
use tower_http::trace::TraceLayer;

use crate::handlers;

pub struct ServerState {
    pub registry: Arc<MetricsRegistry>,
    pub landing_page: String,
}

impl ServerState {
    pub fn new(registry: Arc<MetricsRegistry>, metrics_path: &str) -> Self {
        Self {
            registry,
            landing_page: handlers::render_landing_page(VERSION, metrics_path),
        }
    }
}

pub fn exporter_router(state: Arc<ServerState>, metrics_path: &str) -> Router {
    let mut router = Router::new().route(metrics_path, get(handlers::prometheus_metrics));
    if metrics_path != "/" {
        router = router.route("/", get(handlers::landing_page));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use oracledb_common::error::{ExporterError, Result};
    use oracledb_exporter::{
        Exporter,
        db::{Connection, Connector},
        metrics::CollectionState,
    };
    use tower::ServiceExt;

    use super::*;

    struct Unreachable;

    #[async_trait]
    impl Connector for Unreachable {
        async fn open(&self, _dsn: &str) -> Result<Box<dyn Connection>> {
            Err(ExporterError::Connect("ORA-12541: TNS:no listener".to_string()))
        }
    }

    async fn router(metrics_path: &str) -> Router {
        let exporter = Arc::new(Exporter::new(
            "system/oracle@localhost/XE",
            Arc::new(Unreachable),
            Arc::new(CollectionState::new()),
        ));
        let registry = Arc::new(MetricsRegistry::new());
        registry.register(exporter).await.unwrap();
        exporter_router(Arc::new(ServerState::new(registry, metrics_path)), metrics_path)
    }

    #[tokio::test]
    async fn metrics_endpoint_reports_database_down() {
        let response = router("/metrics")
            .await
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4; charset=utf-8"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("oracledb_up 0\n"));
        assert!(body.contains("oracledb_exporter_last_scrape_error 1\n"));
        // one pass at registration, one for this request
        assert!(body.contains("oracledb_exporter_scrapes_total 2\n"));
    }

    #[tokio::test]
    async fn landing_page_links_to_metrics() {
        let response = router("/oracle")
            .await
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("<a href='/oracle'>Metrics</a>"));
        assert!(body.contains(VERSION));
    }

    #[tokio::test]
    async fn metrics_at_root_replaces_landing_page() {
        let response = router("/")
            .await
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("# TYPE oracledb_up gauge"));
    }
}
