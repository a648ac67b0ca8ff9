// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

/// The closed set of status codes this server emits.
///
/// RFC 9110: https://httpwg.org/specs/rfc9110.html#status.codes
/// IANA: https://www.iana.org/assignments/http-status-codes/http-status-codes.xhtml
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u16)]
pub enum StatusCode {
    Ok = 200,
    Created = 201,
    NoContent = 204,

    NotModified = 304,

    BadRequest = 400,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    RequestTimeout = 408,
    PayloadTooLarge = 413,
    URITooLong = 414,

    InternalServerError = 500,
    NotImplemented = 501,
    ServiceUnavailable = 503,
    HTTPVersionNotSupported = 505,
}

impl StatusCode {
    /// The numeric status code as transmitted on the wire.
    #[must_use]
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Returns the class of this status code, as binned by the
    /// metrics histogram.
    #[must_use]
    pub fn class(&self) -> StatusCodeClass {
        match *self as u16 {
            200..=299 => StatusCodeClass::Success,
            400..=499 => StatusCodeClass::ClientError,
            500..=599 => StatusCodeClass::ServerError,
            _ => StatusCodeClass::Other,
        }
    }

    #[must_use]
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::NotModified => "Not Modified",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::URITooLong => "URI Too Long",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::ServiceUnavailable => "Service Unavailable",
            StatusCode::HTTPVersionNotSupported => "HTTP Version Not Supported",
        }
    }

    /// The `<code> SP <reason-phrase>` fragment of the status line.
    #[must_use]
    pub fn status_line(&self) -> &'static str {
        match self {
            StatusCode::Ok => "200 OK",
            StatusCode::Created => "201 Created",
            StatusCode::NoContent => "204 No Content",
            StatusCode::NotModified => "304 Not Modified",
            StatusCode::BadRequest => "400 Bad Request",
            StatusCode::Forbidden => "403 Forbidden",
            StatusCode::NotFound => "404 Not Found",
            StatusCode::MethodNotAllowed => "405 Method Not Allowed",
            StatusCode::RequestTimeout => "408 Request Timeout",
            StatusCode::PayloadTooLarge => "413 Payload Too Large",
            StatusCode::URITooLong => "414 URI Too Long",
            StatusCode::InternalServerError => "500 Internal Server Error",
            StatusCode::NotImplemented => "501 Not Implemented",
            StatusCode::ServiceUnavailable => "503 Service Unavailable",
            StatusCode::HTTPVersionNotSupported => "505 HTTP Version Not Supported",
        }
    }
}

/// The coarse status classes tracked by the metrics histogram.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatusCodeClass {
    /// 2xx
    Success,

    /// 4xx
    ClientError,

    /// 5xx
    ServerError,

    /// Everything else (1xx, 3xx)
    Other,
}
