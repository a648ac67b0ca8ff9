// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use strum_macros::AsRefStr;

use std::io;

use crate::StatusCode;

#[derive(Debug)]
pub enum Error {
    ParseError(HttpParseError),
    Other(io::Error),
}

impl From<HttpParseError> for Error {
    fn from(error: HttpParseError) -> Self {
        Error::ParseError(error)
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Other(error)
    }
}

/// An error that can occur while parsing an HTTP request. Every
/// variant maps to the status code the connection driver answers
/// with before closing the connection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, AsRefStr)]
pub enum HttpParseError {
    /// `Transfer-Encoding: chunked` and `Content-Length` were both
    /// present. RFC 9112 requires rejecting the combination.
    ConflictingFraming,

    /// The header line didn't contain a colon, it's only the name.
    HeaderMissingColon,

    /// The running byte total of the header section (each line plus
    /// its CRLF) exceeded the configured maximum.
    HeaderSectionTooLarge,

    /// A chunk-size line was not valid hexadecimal, or a chunk was
    /// not terminated by CRLF.
    InvalidChunkFraming,

    /// The `Content-Length` field contained non-numeric characters,
    /// was negative, or was the empty string.
    InvalidContentLength,

    /// A CR appeared that was not immediately followed by an LF.
    InvalidCRLF,

    /// The header field name was empty or contained a non-token
    /// character.
    InvalidHeaderName,

    /// The HTTP version was not exactly `HTTP/1.0` or `HTTP/1.1`.
    InvalidHttpVersion,

    /// The request line did not consist of exactly three fields
    /// separated by single spaces, or the target was empty.
    MalformedRequestLine,

    /// The request was HTTP/1.1 but carried no `Host` field.
    MissingHostHeader,

    /// The declared or decoded body size exceeded the configured
    /// maximum.
    PayloadTooLarge,

    /// The request line (excluding CRLF) exceeded the configured
    /// maximum.
    RequestLineTooLong,

    /// The header field count exceeded the configured maximum.
    TooManyHeaders,

    /// The stream ended in the middle of a request.
    UnexpectedEof,

    /// The method token is not in the supported set.
    UnknownMethod,
}

impl HttpParseError {
    /// The status code the error response is built from.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            HttpParseError::PayloadTooLarge => StatusCode::PayloadTooLarge,
            HttpParseError::RequestLineTooLong => StatusCode::URITooLong,
            HttpParseError::UnknownMethod => StatusCode::NotImplemented,
            HttpParseError::InvalidHttpVersion => StatusCode::HTTPVersionNotSupported,
            _ => StatusCode::BadRequest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(HttpParseError::MalformedRequestLine, StatusCode::BadRequest)]
    #[case(HttpParseError::InvalidCRLF, StatusCode::BadRequest)]
    #[case(HttpParseError::MissingHostHeader, StatusCode::BadRequest)]
    #[case(HttpParseError::ConflictingFraming, StatusCode::BadRequest)]
    #[case(HttpParseError::UnexpectedEof, StatusCode::BadRequest)]
    #[case(HttpParseError::PayloadTooLarge, StatusCode::PayloadTooLarge)]
    #[case(HttpParseError::RequestLineTooLong, StatusCode::URITooLong)]
    #[case(HttpParseError::UnknownMethod, StatusCode::NotImplemented)]
    #[case(HttpParseError::InvalidHttpVersion, StatusCode::HTTPVersionNotSupported)]
    fn error_status_mapping(#[case] error: HttpParseError, #[case] expected: StatusCode) {
        assert_eq!(error.status_code(), expected);
    }
}
