// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use futures::FutureExt;

use tokio::{
    io::{split, AsyncBufRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter},
    net::TcpStream,
    time::{timeout, Instant},
};

use uuid::Uuid;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use fortezza_http::{
    Error,
    Method,
    Request,
    Response,
};

use fortezza_http_handling::{
    responses,
    AccessLog,
    AccessLogEntry,
    MetricsSink,
    ParserLimits,
    RequestHandler,
};

use crate::read::RequestParser;

/// Drives the keep-alive loop of one accepted connection. The driver
/// itself holds only shared immutable pieces, so a single instance
/// serves all connection tasks; everything per-connection lives in
/// [`ConnectionDriver::run`].
pub struct ConnectionDriver {
    handler: Arc<dyn RequestHandler>,
    parser: RequestParser,
    read_timeout: Duration,
    metrics: Option<Arc<dyn MetricsSink>>,
    access_log: AccessLog,
}

impl ConnectionDriver {
    pub fn new(
        handler: Arc<dyn RequestHandler>,
        limits: ParserLimits,
        read_timeout: Duration,
        metrics: Option<Arc<dyn MetricsSink>>,
        access_log: AccessLog,
    ) -> ConnectionDriver {
        ConnectionDriver {
            handler,
            parser: RequestParser::new(limits),
            read_timeout,
            metrics,
            access_log,
        }
    }

    /// Process one socket until either side gives up the connection.
    pub async fn run(&self, stream: TcpStream) {
        let remote = match stream.peer_addr() {
            Ok(address) => address.to_string(),
            Err(_) => "-".to_owned(),
        };

        let (reader, writer) = split(stream);
        let mut reader = BufReader::new(reader);
        let mut writer = BufWriter::new(writer);

        self.serve(&mut reader, &mut writer, &remote).await;

        _ = writer.shutdown().await;
        log::debug!("[{}] connection closed", remote);
    }

    /// The keep-alive loop over an already-buffered stream pair. The
    /// reader is wrapped once by the caller and reused across
    /// iterations, so pipelined bytes survive between requests.
    pub async fn serve<R, W>(&self, reader: &mut R, writer: &mut W, remote: &str)
            where R: AsyncBufRead + Unpin,
                  W: AsyncWrite + Unpin + Send {
        if let Some(metrics) = &self.metrics {
            metrics.connection_opened();
        }

        loop {
            if !self.exchange(reader, writer, remote).await {
                break;
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.connection_closed();
        }
    }

    /// One request/response cycle. Returns whether the loop should
    /// keep going. Every cycle that consumed at least one byte emits
    /// exactly one access-log entry and one metrics record, on the
    /// success path and on every failure path alike.
    async fn exchange<R, W>(&self, reader: &mut R, writer: &mut W, remote: &str) -> bool
            where R: AsyncBufRead + Unpin,
                  W: AsyncWrite + Unpin + Send {
        let start = Instant::now();

        // Seeded before parsing so parse-failure records carry it;
        // replaced by the client's X-Request-Id once one is known.
        let mut request_id = Uuid::new_v4().to_string();

        let parsed = match timeout(self.read_timeout, self.parser.parse(reader)).await {
            Ok(parsed) => parsed,
            Err(_) => {
                // Nothing is written for a timed-out read; the
                // synthetic response only feeds observability.
                let response = responses::request_timeout();
                self.observe(remote, None, &response, start, &request_id);
                return false;
            }
        };

        let request = match parsed {
            Ok(Some(request)) => request,
            Ok(None) => return false,
            Err(Error::ParseError(error)) => {
                log::debug!(
                    "[{}] rejecting malformed request (request_id={}): {}",
                    remote, request_id, error.as_ref(),
                );
                let mut response = responses::parse_error_response(&error);
                let written = response.write_full(writer).await;
                self.observe(remote, None, &response, start, &request_id);
                if let Err(error) = written {
                    log::debug!("[{}] failed to write error response: {}", remote, error);
                }
                return false;
            }
            Err(Error::Other(error)) => {
                // The transport itself failed, so nothing can be
                // written back; the cycle is still recorded.
                log::debug!("[{}] client i/o error (request_id={}): {}", remote, request_id, error);
                let response = Response::internal_server_error();
                self.observe(remote, None, &response, start, &request_id);
                return false;
            }
        };

        if let Some(id) = request.headers.get("X-Request-Id") {
            if !id.trim().is_empty() {
                request_id = id.to_owned();
            }
        }

        // A handler must never take the worker down: errors and
        // panics both funnel into a plain 500, which carries a close
        // directive and therefore ends the loop below.
        let mut response = match AssertUnwindSafe(self.handler.handle(&request)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                log::error!("[{}] handler failed (request_id={}): {:#}", remote, request_id, error);
                Response::internal_server_error()
            }
            Err(_) => {
                log::error!("[{}] handler panicked (request_id={})", remote, request_id);
                Response::internal_server_error()
            }
        };

        response.version(request.version);

        // An explicit directive set by the handler wins; otherwise
        // the request decides, and the decision is stamped onto the
        // response so the header always matches the loop's behavior.
        let keep_alive = if response.has_connection_directive() {
            response.is_connection_persistent()
        } else {
            let decision = request.keep_alive_requested();
            response.keep_alive(decision);
            decision
        };

        let written = if request.method == Method::Head {
            response.write_headers_only(writer).await
        } else {
            response.write_full(writer).await
        };

        self.observe(remote, Some(&request), &response, start, &request_id);

        match written {
            Ok(()) => keep_alive,
            Err(error) => {
                log::debug!("[{}] failed to write response (request_id={}): {}", remote, request_id, error);
                false
            }
        }
    }

    fn observe(
        &self,
        remote: &str,
        request: Option<&Request>,
        response: &Response,
        start: Instant,
        request_id: &str,
    ) {
        let duration_ms = start.elapsed().as_millis() as u64;

        self.access_log.emit(&AccessLogEntry {
            remote,
            request,
            version: response.version,
            status: response.status,
            duration_ms,
            bytes_written: response.bytes_written(),
            content_length: response.content_length(),
            keep_alive: response.is_connection_persistent(),
            request_id,
        });

        if let Some(metrics) = &self.metrics {
            metrics.record_request(
                request.map(|request| request.method),
                response.status,
                duration_ms,
                response.bytes_written(),
            );
        }
    }
}
