// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use fortezza_http::{
    HttpVersion,
    Request,
    StatusCode,
};

/// One structured line per request/response cycle, emitted through
/// the `log` facade under the `fortezza::access` target.
#[derive(Copy, Clone, Debug)]
pub struct AccessLog {
    enabled: bool,
}

/// Everything one access-log line carries. `request` is `None` when
/// the request never parsed; its fields are then logged as `-`.
pub struct AccessLogEntry<'a> {
    pub remote: &'a str,
    pub request: Option<&'a Request>,
    pub version: HttpVersion,
    pub status: StatusCode,
    pub duration_ms: u64,
    pub bytes_written: u64,
    pub content_length: u64,
    pub keep_alive: bool,
    pub request_id: &'a str,
}

impl AccessLog {
    pub fn new(enabled: bool) -> AccessLog {
        AccessLog { enabled }
    }

    pub fn emit(&self, entry: &AccessLogEntry) {
        if !self.enabled || !log::log_enabled!(target: "fortezza::access", log::Level::Info) {
            return;
        }
        log::info!(target: "fortezza::access", "{}", format_entry(entry));
    }
}

fn format_entry(entry: &AccessLogEntry) -> String {
    let method = entry.request.map(|request| request.method.as_str()).unwrap_or("-");
    let path = entry.request.map(|request| request.path.as_str()).unwrap_or("-");
    let query = entry
        .request
        .and_then(|request| request.query_string())
        .unwrap_or("-");

    format!(
        "remote={} method={} path={} query={} version={} status={} duration_ms={} bytes={} content_length={} keep_alive={} request_id={}",
        entry.remote,
        method,
        path,
        query,
        entry.version.as_str(),
        entry.status.code(),
        entry.duration_ms,
        entry.bytes_written,
        entry.content_length,
        entry.keep_alive,
        entry.request_id,
    )
}
