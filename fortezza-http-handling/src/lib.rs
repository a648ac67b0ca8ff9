// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Request handling: configuration, the handler capability and its
//! two concrete variants, and the observability sinks the connection
//! driver reports into.

pub mod access_log;
pub mod config;
pub mod file_handler;
pub mod handler;
pub mod metrics;
pub mod responses;

pub use access_log::{AccessLog, AccessLogEntry};
pub use config::{ParserLimits, Settings};
pub use file_handler::FileHandler;
pub use handler::{MetricsHandler, RequestHandler, ServerHandler};
pub use metrics::{MetricsSink, ServerMetrics};
