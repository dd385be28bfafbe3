use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};

use crate::router::ServerState;

pub async fn prometheus_metrics(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let payload = state.registry.render_prometheus().await;

    let mut response = Response::new(Body::from(payload));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );

    response
}

pub async fn landing_page(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Html(state.landing_page.clone())
}

pub fn render_landing_page(version: &str, metrics_path: &str) -> String {
    format!(
        "<html><head><title>Oracle DB Exporter {version}</title></head>\
         <body><h1>Oracle DB Exporter {version}</h1>\
         <p><a href='{metrics_path}'>Metrics</a></p></body></html>"
    )
}
