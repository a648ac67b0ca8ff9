// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use phf::phf_map;
use unicase::UniCase;

/// The request methods this server recognizes.
///
/// # Notes
/// Method tokens are case-sensitive on the wire, but this server
/// normalizes the case while parsing, so `get` and `GET` resolve to
/// the same variant. Methods outside this set are rejected with
/// `501 Not Implemented` by the parser.
///
/// # References
/// * [RFC 9110 - Section 9. Methods](https://www.rfc-editor.org/rfc/rfc9110.html#section-9)
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    /// Get the method in its canonical all-uppercase string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete => "DELETE",
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Trace => "TRACE",
        }
    }

    /// Resolve a method token, ignoring ASCII case. `None` means the
    /// token is not in the supported set.
    #[must_use]
    pub fn parse(token: &str) -> Option<Method> {
        METHOD_MAP.get(&UniCase::ascii(token)).copied()
    }
}

static METHOD_MAP: phf::Map<UniCase<&'static str>, Method> = phf_map!(
    UniCase::ascii("connect") => Method::Connect,
    UniCase::ascii("delete") => Method::Delete,
    UniCase::ascii("get") => Method::Get,
    UniCase::ascii("head") => Method::Head,
    UniCase::ascii("options") => Method::Options,
    UniCase::ascii("patch") => Method::Patch,
    UniCase::ascii("post") => Method::Post,
    UniCase::ascii("put") => Method::Put,
    UniCase::ascii("trace") => Method::Trace,
);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("GET", Some(Method::Get))]
    #[case("get", Some(Method::Get))]
    #[case("gEt", Some(Method::Get))]
    #[case("HEAD", Some(Method::Head))]
    #[case("POST", Some(Method::Post))]
    #[case("PATCH", Some(Method::Patch))]
    #[case("TRACE", Some(Method::Trace))]
    #[case("CONNECT", Some(Method::Connect))]
    #[case("BREW", None)]
    #[case("PROPFIND", None)]
    #[case("", None)]
    fn parse_method(#[case] input: &str, #[case] expected: Option<Method>) {
        assert_eq!(Method::parse(input), expected);
    }

    #[test]
    fn canonical_form_is_uppercase() {
        assert_eq!(Method::parse("options").unwrap().as_str(), "OPTIONS");
    }
}
