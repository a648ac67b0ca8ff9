// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum HttpVersion {
    Http10,
    Http11,
}

impl HttpVersion {
    /// Formats the [`HttpVersion`] to a HTTP-Version, as specified by RFC 9112.
    ///
    /// # References
    /// * [RFC 9112 Section 2.3](https://www.rfc-editor.org/rfc/rfc9112.html#name-http-version)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http10 => "HTTP/1.0",
            Self::Http11 => "HTTP/1.1",
        }
    }

    /// Resolve an exact HTTP-Version string. Anything other than the
    /// two supported versions is unsupported on a TCP connection.
    #[must_use]
    pub fn parse(value: &str) -> Option<HttpVersion> {
        match value {
            "HTTP/1.0" => Some(HttpVersion::Http10),
            "HTTP/1.1" => Some(HttpVersion::Http11),
            _ => None,
        }
    }
}
