// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::io;
use std::sync::Arc;

use fortezza_http_handling::{
    AccessLog,
    FileHandler,
    MetricsSink,
    ServerHandler,
    ServerMetrics,
    Settings,
};

use fortezza_http1::ConnectionDriver;

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let settings = Settings::from_env();

    let files = FileHandler::new(&settings.document_root)?;
    log::info!("Serving files from {}", files.document_root().display());

    let metrics = settings.metrics_enabled.then(|| Arc::new(ServerMetrics::new()));
    if metrics.is_some() {
        log::info!("Metrics exposed on {}", settings.metrics_path);
    }

    let handler = ServerHandler::new(files, settings.metrics_path.clone(), metrics.clone());

    let driver = Arc::new(ConnectionDriver::new(
        Arc::new(handler),
        settings.limits,
        settings.read_timeout,
        metrics.map(|metrics| metrics as Arc<dyn MetricsSink>),
        AccessLog::new(settings.access_log_enabled),
    ));

    tokio::select! {
        result = fortezza_http1::start(&settings.listen_address, driver) => result,
        result = tokio::signal::ctrl_c() => {
            log::info!("Shutdown signal received, stopping accept loop");
            result
        }
    }
}
