// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use async_trait::async_trait;

use std::sync::Arc;

use fortezza_http::{
    Method,
    Request,
    Response,
};

use fortezza_resources::MediaType;

use crate::{
    FileHandler,
    ServerMetrics,
};

/// The capability the connection driver drives: one request in, one
/// response out. Implementations are shared across connection tasks
/// and hold no per-request state.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: &Request) -> anyhow::Result<Response>;
}

/// Serves a JSON snapshot of the metrics counters.
pub struct MetricsHandler {
    metrics: Arc<ServerMetrics>,
}

impl MetricsHandler {
    pub fn new(metrics: Arc<ServerMetrics>) -> MetricsHandler {
        MetricsHandler { metrics }
    }
}

#[async_trait]
impl RequestHandler for MetricsHandler {
    async fn handle(&self, request: &Request) -> anyhow::Result<Response> {
        if !matches!(request.method, Method::Get | Method::Head) {
            return Ok(Response::method_not_allowed("GET, HEAD"));
        }

        let body = serde_json::to_vec(&self.metrics.snapshot())?;
        let mut response = Response::new();
        response.content_type(MediaType::JSON.as_str()).body(body);
        Ok(response)
    }
}

/// The fixed two-way dispatch of this server: the metrics path is
/// matched before any file resolution, everything else goes to the
/// file handler.
pub struct ServerHandler {
    metrics_path: String,
    metrics: Option<MetricsHandler>,
    files: FileHandler,
}

impl ServerHandler {
    pub fn new(files: FileHandler, metrics_path: String, metrics: Option<Arc<ServerMetrics>>) -> ServerHandler {
        ServerHandler {
            metrics_path,
            metrics: metrics.map(MetricsHandler::new),
            files,
        }
    }
}

#[async_trait]
impl RequestHandler for ServerHandler {
    async fn handle(&self, request: &Request) -> anyhow::Result<Response> {
        if let Some(metrics) = &self.metrics {
            if request.path == self.metrics_path {
                return metrics.handle(request).await;
            }
        }

        self.files.handle(request).await
    }
}
