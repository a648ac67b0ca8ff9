// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use async_trait::async_trait;

use tokio::io::{
    AsyncRead,
    AsyncReadExt,
    AsyncWrite,
    AsyncWriteExt,
};

use std::fmt;
use std::io;

use crate::{
    HeaderMap,
    HttpVersion,
    StatusCode,
};

/// The `Server` header value stamped on every response.
pub const SERVER_IDENT: &str = "fortezza/1.0";

/// The explicit persistence decision carried on a response, distinct
/// from the protocol default of its version.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConnectionDirective {
    Unset,
    Persistent,
    Close,
}

/// A deferred producer of a readable byte stream, so a large body is
/// never materialized in memory. `open` is called once per write, at
/// transfer time.
#[async_trait]
pub trait BodySupplier: Send + Sync {
    async fn open(&self) -> io::Result<Box<dyn AsyncRead + Send + Unpin>>;
}

enum ResponseBody {
    Inline(Vec<u8>),
    Stream(Box<dyn BodySupplier>),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Inline(bytes) => write!(f, "Inline({} bytes)", bytes.len()),
            ResponseBody::Stream(_) => write!(f, "Stream"),
        }
    }
}

/// A response under construction. Built by a handler, then serialized
/// exactly once by the connection driver.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub version: HttpVersion,
    pub headers: HeaderMap,
    body: ResponseBody,
    directive: ConnectionDirective,
    bytes_written: u64,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Response {
        let mut headers = HeaderMap::new();
        headers.insert("Server", SERVER_IDENT);
        Response {
            status: StatusCode::Ok,
            version: HttpVersion::Http11,
            headers,
            body: ResponseBody::Inline(Vec::new()),
            directive: ConnectionDirective::Unset,
            bytes_written: 0,
        }
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn version(&mut self, version: HttpVersion) -> &mut Self {
        self.version = version;
        self
    }

    /// Set a header field. A `Connection` header additionally marks
    /// the connection directive: `close` closes, any other value is
    /// an explicit request to persist.
    pub fn header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        if name.eq_ignore_ascii_case("Connection") {
            self.directive = if value.eq_ignore_ascii_case("close") {
                ConnectionDirective::Close
            } else {
                ConnectionDirective::Persistent
            };
        }
        self.headers.insert(name, value);
        self
    }

    pub fn content_type(&mut self, value: &str) -> &mut Self {
        self.header("Content-Type", value)
    }

    /// Set an inline body. Sets `Content-Length` to the byte length
    /// and replaces any body-supplier.
    pub fn body(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        let body = body.into();
        self.headers.insert("Content-Length", body.len().to_string());
        self.body = ResponseBody::Inline(body);
        self
    }

    /// Declare the body length without materializing the payload.
    /// Must be paired with [`Response::set_body_supplier`].
    pub fn body_length(&mut self, length: u64) -> &mut Self {
        self.headers.insert("Content-Length", length.to_string());
        self
    }

    pub fn set_body_supplier(&mut self, supplier: Box<dyn BodySupplier>) -> &mut Self {
        self.body = ResponseBody::Stream(supplier);
        self
    }

    /// Decide persistence explicitly. On HTTP/1.1 persistence is the
    /// protocol default, so `true` clears any `Connection` header
    /// rather than writing `keep-alive`; HTTP/1.0 always writes the
    /// decision out.
    pub fn keep_alive(&mut self, keep_alive: bool) -> &mut Self {
        match (self.version, keep_alive) {
            (HttpVersion::Http11, true) => {
                self.headers.remove("Connection");
                self.directive = ConnectionDirective::Unset;
            }
            (HttpVersion::Http10, true) => {
                self.headers.insert("Connection", "keep-alive");
                self.directive = ConnectionDirective::Persistent;
            }
            (_, false) => {
                self.headers.insert("Connection", "close");
                self.directive = ConnectionDirective::Close;
            }
        }
        self
    }

    #[must_use]
    pub fn has_connection_directive(&self) -> bool {
        self.directive != ConnectionDirective::Unset
    }

    /// The explicit directive when one is set, otherwise the version
    /// default.
    #[must_use]
    pub fn is_connection_persistent(&self) -> bool {
        match self.directive {
            ConnectionDirective::Persistent => true,
            ConnectionDirective::Close => false,
            ConnectionDirective::Unset => self.version == HttpVersion::Http11,
        }
    }

    /// The declared `Content-Length`, 0 when absent.
    #[must_use]
    pub fn content_length(&self) -> u64 {
        self.headers
            .get("Content-Length")
            .and_then(|value| value.parse().ok())
            .unwrap_or(0)
    }

    /// Body bytes put on the wire by the last write: the declared
    /// `Content-Length` after a full write, 0 after a headers-only
    /// write.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Serialize status line, headers and body. The body-supplier, if
    /// one is set, is opened lazily and its stream dropped after the
    /// transfer, also on write errors.
    pub async fn write_full<W>(&mut self, out: &mut W) -> Result<(), io::Error>
            where W: AsyncWrite + Unpin {
        let head = self.serialize_head();
        out.write_all(head.as_bytes()).await?;

        match &self.body {
            ResponseBody::Inline(bytes) => out.write_all(bytes).await?,
            ResponseBody::Stream(supplier) => {
                let mut reader = supplier.open().await?;
                let mut buf = [0u8; 8192];
                loop {
                    let len = reader.read(&mut buf).await?;
                    if len == 0 {
                        break;
                    }
                    out.write_all(&buf[..len]).await?;
                }
            }
        }

        out.flush().await?;
        self.bytes_written = self.content_length();
        Ok(())
    }

    /// Serialize the status line, headers and terminating CRLF only.
    /// Used for responses to HEAD requests.
    pub async fn write_headers_only<W>(&mut self, out: &mut W) -> Result<(), io::Error>
            where W: AsyncWrite + Unpin {
        let head = self.serialize_head();
        out.write_all(head.as_bytes()).await?;
        out.flush().await?;
        self.bytes_written = 0;
        Ok(())
    }

    /// The status/header block. Strings here are ASCII already, so
    /// the ISO-8859-1 encoding of the wire format is the identity.
    fn serialize_head(&mut self) -> String {
        if !self.headers.contains("Content-Length") {
            let length = match &self.body {
                ResponseBody::Inline(bytes) => bytes.len(),
                ResponseBody::Stream(_) => 0,
            };
            self.headers.insert("Content-Length", length.to_string());
        }

        let mut head = String::with_capacity(256);
        head.push_str(self.version.as_str());
        head.push(' ');
        head.push_str(self.status.status_line());
        head.push_str("\r\n");

        for (name, value) in self.headers.iter() {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }

        head.push_str("\r\n");
        head
    }
}

//
// Canned error responses
//
impl Response {
    /// A minimal HTML error page: status code, reason phrase, and the
    /// escaped message. The connection is marked for closing.
    pub fn error(status: StatusCode, message: &str) -> Response {
        let body = format!(
            "<h1>{} {}</h1>\n<hr>\n<p>{}</p>\n",
            status.code(),
            status.reason_phrase(),
            html_escape(message),
        );

        let mut response = Response::new();
        response
            .status(status)
            .content_type("text/html; charset=UTF-8")
            .header("Connection", "close")
            .body(body);
        response
    }

    pub fn not_found() -> Response {
        Self::error(StatusCode::NotFound, "The requested resource was not found.")
    }

    pub fn method_not_allowed(allowed: &str) -> Response {
        let mut response = Self::error(StatusCode::MethodNotAllowed, "Method not allowed.");
        response.header("Allow", allowed);
        response
    }

    pub fn internal_server_error() -> Response {
        Self::error(StatusCode::InternalServerError, "An unexpected error occurred.")
    }
}

/// Escape `& < > " '` so interpolated messages can never carry markup
/// into the error page.
fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}
