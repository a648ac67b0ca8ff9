// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::borrow::Cow;

use crate::{
    HeaderMap,
    HttpVersion,
    Method,
};

/// One parsed request. Immutable after the parser constructs it and
/// owned by a single connection task.
#[derive(Debug)]
pub struct Request {
    pub method: Method,

    /// The request-target exactly as it appeared on the wire.
    pub target: String,

    /// The path component of the target. NOT percent-decoded; the
    /// file handler resolves the raw form.
    pub path: String,

    /// Decoded query parameters in first-seen order; a duplicate key
    /// overwrites the earlier value.
    pub query: Vec<(String, String)>,

    pub version: HttpVersion,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(
        method: Method,
        target: String,
        version: HttpVersion,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Request {
        let (path, raw_query) = match target.split_once('?') {
            Some((path, query)) => (path.to_owned(), Some(query)),
            None => (target.clone(), None),
        };
        let query = raw_query.map(parse_query).unwrap_or_default();

        Request { method, target, path, query, version, headers, body }
    }

    /// The raw query string after `?`, if the target carried one.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, query)| query)
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The persistence the client asked for. HTTP/1.1 defaults to
    /// persistent unless the `Connection` value is exactly `close`;
    /// HTTP/1.0 is only persistent on an exact `keep-alive`.
    #[must_use]
    pub fn keep_alive_requested(&self) -> bool {
        let connection = self.headers.get("Connection");
        match self.version {
            HttpVersion::Http11 => {
                !matches!(connection, Some(value) if value.eq_ignore_ascii_case("close"))
            }
            HttpVersion::Http10 => {
                matches!(connection, Some(value) if value.eq_ignore_ascii_case("keep-alive"))
            }
        }
    }
}

/// Split a raw query string on `&`, percent-decode each side of the
/// first `=`, and collapse duplicate keys (last write wins, position
/// of the first occurrence is kept).
fn parse_query(raw: &str) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = Vec::new();

    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.split_once('=') {
            Some((key, value)) => (percent_decode(key), percent_decode(value)),
            None => (percent_decode(pair), String::new()),
        };

        match params.iter_mut().find(|(stored, _)| *stored == key) {
            Some(entry) => entry.1 = value,
            None => params.push((key, value)),
        }
    }

    params
}

/// Percent-decoding is UTF-8; a sequence that doesn't decode to
/// valid UTF-8 is kept in its raw form.
fn percent_decode(value: &str) -> String {
    match urlencoding::decode(value) {
        Ok(Cow::Owned(decoded)) => decoded,
        Ok(Cow::Borrowed(decoded)) => decoded.to_owned(),
        Err(_) => value.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request(target: &str, version: HttpVersion, headers: HeaderMap) -> Request {
        Request::new(Method::Get, target.to_owned(), version, headers, Vec::new())
    }

    #[test]
    fn target_splits_into_path_and_query() {
        let request = request("/search?q=hello%20world&page=2", HttpVersion::Http11, HeaderMap::new());
        assert_eq!(request.path, "/search");
        assert_eq!(request.query_string(), Some("q=hello%20world&page=2"));
        assert_eq!(request.query_param("q"), Some("hello world"));
        assert_eq!(request.query_param("page"), Some("2"));
    }

    #[test]
    fn path_is_not_percent_decoded() {
        let request = request("/%2e%2e/secret", HttpVersion::Http11, HeaderMap::new());
        assert_eq!(request.path, "/%2e%2e/secret");
    }

    #[test]
    fn duplicate_query_keys_last_write_wins() {
        let request = request("/?a=1&b=2&a=3", HttpVersion::Http11, HeaderMap::new());
        assert_eq!(request.query, vec![
            ("a".to_owned(), "3".to_owned()),
            ("b".to_owned(), "2".to_owned()),
        ]);
    }

    #[test]
    fn valueless_query_key_is_empty_string() {
        let request = request("/?debug&x=1", HttpVersion::Http11, HeaderMap::new());
        assert_eq!(request.query_param("debug"), Some(""));
    }

    #[rstest]
    #[case(HttpVersion::Http11, None, true)]
    #[case(HttpVersion::Http11, Some("close"), false)]
    #[case(HttpVersion::Http11, Some("CLOSE"), false)]
    #[case(HttpVersion::Http11, Some("keep-alive"), true)]
    #[case(HttpVersion::Http10, None, false)]
    #[case(HttpVersion::Http10, Some("keep-alive"), true)]
    #[case(HttpVersion::Http10, Some("Keep-Alive"), true)]
    #[case(HttpVersion::Http10, Some("close"), false)]
    fn keep_alive_derivation(
        #[case] version: HttpVersion,
        #[case] connection: Option<&str>,
        #[case] expected: bool,
    ) {
        let mut headers = HeaderMap::new();
        if let Some(value) = connection {
            headers.insert("Connection", value);
        }
        assert_eq!(request("/", version, headers).keep_alive_requested(), expected);
    }
}
