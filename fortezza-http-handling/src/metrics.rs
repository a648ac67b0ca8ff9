// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use serde::Serialize;

use std::sync::atomic::{AtomicU64, Ordering};

use fortezza_http::{
    Method,
    StatusCode,
    StatusCodeClass,
};

/// The sink the connection driver reports into. The sink is shared
/// across all connection tasks, so implementations must tolerate
/// concurrent recording.
pub trait MetricsSink: Send + Sync {
    fn connection_opened(&self);
    fn connection_closed(&self);

    /// Record one request/response cycle. `method` is `None` when the
    /// request never parsed.
    fn record_request(
        &self,
        method: Option<Method>,
        status: StatusCode,
        duration_ms: u64,
        bytes_written: u64,
    );
}

/// Counter-based metrics over atomic adders. Snapshot reads are
/// eventually consistent with concurrent recorders; no field is ever
/// behind a lock.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    total_requests: AtomicU64,
    active_connections: AtomicU64,
    bytes_sent: AtomicU64,

    success: AtomicU64,
    client_error: AtomicU64,
    server_error: AtomicU64,
    other: AtomicU64,

    under_100ms: AtomicU64,
    under_500ms: AtomicU64,
    under_1s: AtomicU64,
    over_1s: AtomicU64,
}

impl ServerMetrics {
    pub fn new() -> ServerMetrics {
        ServerMetrics::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            status_counts: StatusCounts {
                success: self.success.load(Ordering::Relaxed),
                client_error: self.client_error.load(Ordering::Relaxed),
                server_error: self.server_error.load(Ordering::Relaxed),
                other: self.other.load(Ordering::Relaxed),
            },
            latency_buckets: LatencyBuckets {
                under_100ms: self.under_100ms.load(Ordering::Relaxed),
                under_500ms: self.under_500ms.load(Ordering::Relaxed),
                under_1s: self.under_1s.load(Ordering::Relaxed),
                over_1s: self.over_1s.load(Ordering::Relaxed),
            },
        }
    }
}

impl MetricsSink for ServerMetrics {
    fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    fn record_request(
        &self,
        _method: Option<Method>,
        status: StatusCode,
        duration_ms: u64,
        bytes_written: u64,
    ) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes_written, Ordering::Relaxed);

        let class_counter = match status.class() {
            StatusCodeClass::Success => &self.success,
            StatusCodeClass::ClientError => &self.client_error,
            StatusCodeClass::ServerError => &self.server_error,
            StatusCodeClass::Other => &self.other,
        };
        class_counter.fetch_add(1, Ordering::Relaxed);

        let bucket = match duration_ms {
            0..=99 => &self.under_100ms,
            100..=499 => &self.under_500ms,
            500..=999 => &self.under_1s,
            _ => &self.over_1s,
        };
        bucket.fetch_add(1, Ordering::Relaxed);
    }
}

/// One eventually-consistent view of the counters, serialized by the
/// metrics endpoint with stable key names.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    #[serde(rename = "totalRequests")]
    pub total_requests: u64,
    #[serde(rename = "activeConnections")]
    pub active_connections: u64,
    #[serde(rename = "bytesSent")]
    pub bytes_sent: u64,
    #[serde(rename = "statusCounts")]
    pub status_counts: StatusCounts,
    #[serde(rename = "latencyBuckets")]
    pub latency_buckets: LatencyBuckets,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    #[serde(rename = "SUCCESS")]
    pub success: u64,
    #[serde(rename = "CLIENT_ERROR")]
    pub client_error: u64,
    #[serde(rename = "SERVER_ERROR")]
    pub server_error: u64,
    #[serde(rename = "OTHER")]
    pub other: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LatencyBuckets {
    #[serde(rename = "UNDER_100MS")]
    pub under_100ms: u64,
    #[serde(rename = "UNDER_500MS")]
    pub under_500ms: u64,
    #[serde(rename = "UNDER_1S")]
    pub under_1s: u64,
    #[serde(rename = "OVER_1S")]
    pub over_1s: u64,
}
