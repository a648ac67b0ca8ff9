// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! This module creates complete responses for handling common cases.

use fortezza_http::{
    HttpParseError,
    Response,
    StatusCode,
};

/// The response a parse failure is answered with, built from the
/// status the error carries. The message is the error's symbolic
/// name; it passes through HTML escaping like any other message.
pub fn parse_error_response(error: &HttpParseError) -> Response {
    Response::error(error.status_code(), error.as_ref())
}

/// The synthetic response recorded when the client read times out.
/// Nothing is written to the socket for this case; the value only
/// feeds the observability sinks.
pub fn request_timeout() -> Response {
    Response::error(StatusCode::RequestTimeout, "The connection timed out waiting for a request.")
}
