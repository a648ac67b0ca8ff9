// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use tokio::io::{
    AsyncBufRead,
    AsyncReadExt,
};

use std::io;

use fortezza_http::{
    syntax,
    Error,
    HeaderMap,
    HttpParseError,
    HttpVersion,
    Method,
    Request,
};

use fortezza_http_handling::ParserLimits;

/// The maximum length of a chunk-size line, including extensions.
/// Far above anything a legitimate client produces.
const MAX_CHUNK_SIZE_LINE: usize = 1024;

/// Reads one request at a time from a buffered byte source. Holds
/// only the configured limits, so a single instance is shared by all
/// connection tasks; the stream position is the caller's.
#[derive(Copy, Clone, Debug)]
pub struct RequestParser {
    limits: ParserLimits,
}

impl RequestParser {
    pub fn new(limits: ParserLimits) -> RequestParser {
        RequestParser { limits }
    }

    /// Read one full request. `Ok(None)` is the graceful end of the
    /// stream: EOF before the first byte of a request line. EOF
    /// anywhere later in the request is a parse error.
    ///
    /// The stream may carry several pipelined requests; each call
    /// consumes exactly one.
    pub async fn parse<R>(&self, stream: &mut R) -> Result<Option<Request>, Error>
            where R: AsyncBufRead + Unpin {
        let Some(line) = read_line(stream, self.limits.max_request_line, HttpParseError::RequestLineTooLong).await? else {
            return Ok(None);
        };

        let (method, target, version) = parse_request_line(&line)?;
        let headers = self.read_headers(stream).await?;

        if version == HttpVersion::Http11 && !headers.contains("Host") {
            return Err(HttpParseError::MissingHostHeader.into());
        }

        let body = self.read_body(stream, &headers).await?;

        Ok(Some(Request::new(method, target, version, headers, body)))
    }

    /// Reads the header section up to and including the bare CRLF.
    /// Two running totals are enforced: section bytes (each line plus
    /// its CRLF) and field-line count.
    async fn read_headers<R>(&self, stream: &mut R) -> Result<HeaderMap, Error>
            where R: AsyncBufRead + Unpin {
        let mut headers = HeaderMap::new();
        let mut section_bytes = 0usize;
        let mut field_lines = 0usize;

        loop {
            let remaining = self.limits.max_header_section.saturating_sub(section_bytes);
            let line = read_line(stream, remaining, HttpParseError::HeaderSectionTooLarge)
                .await?
                .ok_or(HttpParseError::UnexpectedEof)?;

            section_bytes += line.len() + 2;
            if section_bytes > self.limits.max_header_section {
                return Err(HttpParseError::HeaderSectionTooLarge.into());
            }

            if line.is_empty() {
                return Ok(headers);
            }

            field_lines += 1;
            if field_lines > self.limits.max_headers {
                return Err(HttpParseError::TooManyHeaders.into());
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(HttpParseError::HeaderMissingColon.into());
            };
            if !syntax::is_token(name) {
                return Err(HttpParseError::InvalidHeaderName.into());
            }

            headers.insert(name, value.trim_matches(syntax::is_ows));
        }
    }

    /// Reads the request body as selected by the framing headers.
    /// Carrying both `Transfer-Encoding: chunked` and
    /// `Content-Length` is rejected outright.
    async fn read_body<R>(&self, stream: &mut R, headers: &HeaderMap) -> Result<Vec<u8>, Error>
            where R: AsyncBufRead + Unpin {
        let chunked = matches!(
            headers.get("Transfer-Encoding"),
            Some(value) if value.eq_ignore_ascii_case("chunked")
        );
        let content_length = headers.get("Content-Length");

        if chunked && content_length.is_some() {
            return Err(HttpParseError::ConflictingFraming.into());
        }

        if chunked {
            return self.read_chunked_body(stream).await;
        }

        let Some(value) = content_length else {
            return Ok(Vec::new());
        };

        if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(HttpParseError::InvalidContentLength.into());
        }
        // An all-digits value can only fail to parse by overflowing,
        // which is over any configurable body limit.
        let length: usize = value.parse().map_err(|_| HttpParseError::PayloadTooLarge)?;
        if length > self.limits.max_body {
            return Err(HttpParseError::PayloadTooLarge.into());
        }

        let mut body = vec![0u8; length];
        stream.read_exact(&mut body).await.map_err(map_read_error)?;
        Ok(body)
    }

    /// Chunked transfer coding per RFC 9112 Section 7.1. Chunk
    /// extensions and trailer fields are discarded; the cumulative
    /// decoded size is held to the body limit.
    async fn read_chunked_body<R>(&self, stream: &mut R) -> Result<Vec<u8>, Error>
            where R: AsyncBufRead + Unpin {
        let mut body = Vec::new();

        loop {
            let line = read_line(stream, MAX_CHUNK_SIZE_LINE, HttpParseError::InvalidChunkFraming)
                .await?
                .ok_or(HttpParseError::UnexpectedEof)?;

            let size_token = match line.split_once(';') {
                Some((size, _extensions)) => size,
                None => line.as_str(),
            };
            let size_token = size_token.trim_matches(syntax::is_ows);
            if size_token.is_empty() || !size_token.bytes().all(|byte| byte.is_ascii_hexdigit()) {
                return Err(HttpParseError::InvalidChunkFraming.into());
            }
            let size = usize::from_str_radix(size_token, 16)
                .map_err(|_| HttpParseError::InvalidChunkFraming)?;

            if size == 0 {
                break;
            }

            if self.limits.max_body - body.len() < size {
                return Err(HttpParseError::PayloadTooLarge.into());
            }

            let start = body.len();
            body.resize(start + size, 0);
            stream.read_exact(&mut body[start..]).await.map_err(map_read_error)?;

            consume_chunk_crlf(stream).await?;
        }

        // Trailer section: lines until a bare CRLF, discarded but
        // still bounded like the header section.
        let mut trailer_bytes = 0usize;
        loop {
            let remaining = self.limits.max_header_section.saturating_sub(trailer_bytes);
            let line = read_line(stream, remaining, HttpParseError::HeaderSectionTooLarge)
                .await?
                .ok_or(HttpParseError::UnexpectedEof)?;
            if line.is_empty() {
                break;
            }
            trailer_bytes += line.len() + 2;
        }

        Ok(body)
    }
}

/// Split the request line into its three single-space-separated
/// fields and resolve each.
fn parse_request_line(line: &str) -> Result<(Method, String, HttpVersion), Error> {
    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() != 3 {
        return Err(HttpParseError::MalformedRequestLine.into());
    }
    let (method_token, target, version_token) = (fields[0], fields[1], fields[2]);

    if !syntax::is_token(method_token) || target.is_empty() {
        return Err(HttpParseError::MalformedRequestLine.into());
    }

    let method = Method::parse(method_token).ok_or(HttpParseError::UnknownMethod)?;
    let version = HttpVersion::parse(version_token).ok_or(HttpParseError::InvalidHttpVersion)?;

    Ok((method, target.to_owned(), version))
}

/// Reads a CRLF-terminated line, two-state: a CR must be followed by
/// an LF, and the CR is never kept. The limit applies to the line
/// bytes excluding the CRLF; exceeding it yields `overflow`.
///
/// `Ok(None)` is returned for EOF before the first byte only; EOF
/// anywhere inside the line (including between CR and LF) is a parse
/// error.
async fn read_line<R>(stream: &mut R, limit: usize, overflow: HttpParseError) -> Result<Option<String>, Error>
        where R: AsyncBufRead + Unpin {
    let mut line = String::new();

    loop {
        let byte = match stream.read_u8().await {
            Ok(byte) => byte,
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                if line.is_empty() {
                    return Ok(None);
                }
                return Err(HttpParseError::UnexpectedEof.into());
            }
            Err(error) => return Err(error.into()),
        };

        if byte == b'\r' {
            let next = stream.read_u8().await.map_err(map_read_error)?;
            if next != b'\n' {
                return Err(HttpParseError::InvalidCRLF.into());
            }
            return Ok(Some(line));
        }

        if line.len() == limit {
            return Err(overflow.into());
        }
        line.push(byte as char);
    }
}

/// Consume the CRLF that terminates a chunk's data.
async fn consume_chunk_crlf<R>(stream: &mut R) -> Result<(), Error>
        where R: AsyncBufRead + Unpin {
    let mut delimiter = [0u8; 2];
    stream.read_exact(&mut delimiter).await.map_err(map_read_error)?;
    if &delimiter != b"\r\n" {
        return Err(HttpParseError::InvalidChunkFraming.into());
    }
    Ok(())
}

fn map_read_error(error: io::Error) -> Error {
    if error.kind() == io::ErrorKind::UnexpectedEof {
        HttpParseError::UnexpectedEof.into()
    } else {
        error.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parser() -> RequestParser {
        RequestParser::new(ParserLimits::default())
    }

    fn parser_with(limits: ParserLimits) -> RequestParser {
        RequestParser::new(limits)
    }

    async fn parse_str(input: &str) -> Result<Option<Request>, Error> {
        let mut stream = std::io::Cursor::new(input.as_bytes().to_vec());
        parser().parse(&mut stream).await
    }

    async fn parse_error_of(input: &str) -> HttpParseError {
        match parse_str(input).await {
            Err(Error::ParseError(error)) => error,
            other => panic!("expected a parse error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn parse_simple_get() {
        let request = parse_str("GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.target, "/index.html");
        assert_eq!(request.path, "/index.html");
        assert_eq!(request.version, HttpVersion::Http11);
        assert_eq!(request.headers.get("host"), Some("example.com"));
        assert!(request.body.is_empty());
    }

    #[tokio::test]
    async fn parse_consumes_exactly_one_pipelined_request() {
        let input = b"GET /a HTTP/1.1\r\nHost: x\r\n\r\nGET /b HTTP/1.1\r\nHost: x\r\n\r\n".to_vec();
        let mut stream = std::io::Cursor::new(input);
        let parser = parser();

        let first = parser.parse(&mut stream).await.unwrap().unwrap();
        assert_eq!(first.target, "/a");
        assert_eq!(stream.position() as usize, b"GET /a HTTP/1.1\r\nHost: x\r\n\r\n".len());

        let second = parser.parse(&mut stream).await.unwrap().unwrap();
        assert_eq!(second.target, "/b");

        assert!(parser.parse(&mut stream).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_input_is_graceful_eof() {
        assert!(parse_str("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn truncation_after_first_byte_is_bad_request() {
        for length in 1.."GET / HTTP/1.1\r\nHost: x\r\n\r\n".len() {
            let truncated = &"GET / HTTP/1.1\r\nHost: x\r\n\r\n"[..length];
            let error = parse_error_of(truncated).await;
            assert_eq!(
                error.status_code().code(), 400,
                "truncation at {} gave {:?}", length, error,
            );
        }
    }

    #[rstest]
    #[case("GET  / HTTP/1.1\r\n\r\n", HttpParseError::MalformedRequestLine)]
    #[case("GET / HTTP/1.1 extra\r\n\r\n", HttpParseError::MalformedRequestLine)]
    #[case("GET\r\n\r\n", HttpParseError::MalformedRequestLine)]
    #[case("GET /\r\n\r\n", HttpParseError::MalformedRequestLine)]
    #[case("G@T / HTTP/1.1\r\n\r\n", HttpParseError::MalformedRequestLine)]
    #[case("BREW /pot HTTP/1.1\r\n\r\n", HttpParseError::UnknownMethod)]
    #[case("GET / HTTP/2.0\r\n\r\n", HttpParseError::InvalidHttpVersion)]
    #[case("GET / http/1.1\r\n\r\n", HttpParseError::InvalidHttpVersion)]
    #[case("GET / HTTP/1.1.1\r\n\r\n", HttpParseError::InvalidHttpVersion)]
    #[tokio::test]
    async fn request_line_validation(#[case] input: &str, #[case] expected: HttpParseError) {
        assert_eq!(parse_error_of(input).await, expected);
    }

    #[tokio::test]
    async fn method_case_is_normalized() {
        let request = parse_str("get / HTTP/1.1\r\nHost: x\r\n\r\n").await.unwrap().unwrap();
        assert_eq!(request.method, Method::Get);
    }

    #[tokio::test]
    async fn oversize_request_line_is_uri_too_long() {
        let limits = ParserLimits { max_request_line: 100, ..ParserLimits::default() };
        let input = format!("GET /{} HTTP/1.1\r\nHost: x\r\n\r\n", "a".repeat(9000));
        let mut stream = std::io::Cursor::new(input.into_bytes());
        let result = parser_with(limits).parse(&mut stream).await;
        assert!(matches!(result, Err(Error::ParseError(HttpParseError::RequestLineTooLong))));
    }

    #[tokio::test]
    async fn request_line_exactly_at_limit_is_accepted() {
        let line = "GET /aaaa HTTP/1.1";
        let limits = ParserLimits { max_request_line: line.len(), ..ParserLimits::default() };
        let input = format!("{}\r\nHost: x\r\n\r\n", line);
        let mut stream = std::io::Cursor::new(input.into_bytes());
        let request = parser_with(limits).parse(&mut stream).await.unwrap().unwrap();
        assert_eq!(request.target, "/aaaa");
    }

    #[rstest]
    #[case("GET / HTTP/1.1\r\nHost example.com\r\n\r\n", HttpParseError::HeaderMissingColon)]
    #[case("GET / HTTP/1.1\r\nBad Header: x\r\n\r\n", HttpParseError::InvalidHeaderName)]
    #[case("GET / HTTP/1.1\r\n: empty-name\r\n\r\n", HttpParseError::InvalidHeaderName)]
    #[case("GET / HTTP/1.1\r\nHost : x\r\n\r\n", HttpParseError::InvalidHeaderName)]
    #[case("GET / HTTP/1.1\r\nHost: x\rY\r\n\r\n", HttpParseError::InvalidCRLF)]
    #[tokio::test]
    async fn header_validation(#[case] input: &str, #[case] expected: HttpParseError) {
        assert_eq!(parse_error_of(input).await, expected);
    }

    #[tokio::test]
    async fn header_values_are_ows_trimmed_and_interior_preserved() {
        let request = parse_str("GET / HTTP/1.1\r\nHost: x\r\nX-Note: \t a  b \t\r\nX-Empty:\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.headers.get("X-Note"), Some("a  b"));
        assert_eq!(request.headers.get("X-Empty"), Some(""));
    }

    #[tokio::test]
    async fn missing_host_on_http11_is_rejected() {
        assert_eq!(parse_error_of("GET / HTTP/1.1\r\n\r\n").await, HttpParseError::MissingHostHeader);
    }

    #[tokio::test]
    async fn http10_does_not_require_host() {
        let request = parse_str("GET / HTTP/1.0\r\n\r\n").await.unwrap().unwrap();
        assert_eq!(request.version, HttpVersion::Http10);
    }

    #[tokio::test]
    async fn too_many_headers_is_rejected() {
        let limits = ParserLimits { max_headers: 2, ..ParserLimits::default() };
        let input = "GET / HTTP/1.1\r\nHost: x\r\nA: 1\r\nB: 2\r\n\r\n";
        let mut stream = std::io::Cursor::new(input.as_bytes().to_vec());
        let result = parser_with(limits).parse(&mut stream).await;
        assert!(matches!(result, Err(Error::ParseError(HttpParseError::TooManyHeaders))));
    }

    #[tokio::test]
    async fn oversize_header_section_is_rejected() {
        let limits = ParserLimits { max_header_section: 64, ..ParserLimits::default() };
        let input = format!("GET / HTTP/1.1\r\nHost: x\r\nX-Filler: {}\r\n\r\n", "y".repeat(200));
        let mut stream = std::io::Cursor::new(input.into_bytes());
        let result = parser_with(limits).parse(&mut stream).await;
        assert!(matches!(result, Err(Error::ParseError(HttpParseError::HeaderSectionTooLarge))));
    }

    #[tokio::test]
    async fn content_length_body_is_read_exactly() {
        let input = "POST /x HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhelloGET";
        let mut stream = std::io::Cursor::new(input.as_bytes().to_vec());
        let request = parser().parse(&mut stream).await.unwrap().unwrap();
        assert_eq!(request.body, b"hello");
        // The next pipelined bytes are left in the stream.
        assert_eq!(stream.position() as usize, input.len() - 3);
    }

    #[rstest]
    #[case("Content-Length: abc", HttpParseError::InvalidContentLength)]
    #[case("Content-Length: -5", HttpParseError::InvalidContentLength)]
    #[case("Content-Length: +5", HttpParseError::InvalidContentLength)]
    #[case("Content-Length:", HttpParseError::InvalidContentLength)]
    #[case("Content-Length: 5 5", HttpParseError::InvalidContentLength)]
    #[tokio::test]
    async fn invalid_content_length(#[case] header: &str, #[case] expected: HttpParseError) {
        let input = format!("POST / HTTP/1.1\r\nHost: x\r\n{}\r\n\r\n", header);
        assert_eq!(parse_error_of(&input).await, expected);
    }

    #[tokio::test]
    async fn content_length_over_limit_is_payload_too_large() {
        let limits = ParserLimits { max_body: 4, ..ParserLimits::default() };
        let input = "POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhello";
        let mut stream = std::io::Cursor::new(input.as_bytes().to_vec());
        let result = parser_with(limits).parse(&mut stream).await;
        assert!(matches!(result, Err(Error::ParseError(HttpParseError::PayloadTooLarge))));
    }

    #[tokio::test]
    async fn short_body_is_bad_request() {
        let error = parse_error_of("POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 10\r\n\r\nhi").await;
        assert_eq!(error, HttpParseError::UnexpectedEof);
        assert_eq!(error.status_code().code(), 400);
    }

    #[tokio::test]
    async fn chunked_body_is_decoded() {
        let input = "POST /x HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n\
                     5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
        let request = parse_str(input).await.unwrap().unwrap();
        assert_eq!(request.body, b"hello world");
    }

    #[tokio::test]
    async fn chunk_extensions_and_trailers_are_discarded() {
        let input = "POST /x HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: CHUNKED\r\n\r\n\
                     4;ext=1\r\nwiki\r\n0\r\nExpires: never\r\n\r\n";
        let mut stream = std::io::Cursor::new(input.as_bytes().to_vec());
        let parser = parser();
        let request = parser.parse(&mut stream).await.unwrap().unwrap();
        assert_eq!(request.body, b"wiki");
        // The trailer section was fully consumed.
        assert!(parser.parse(&mut stream).await.unwrap().is_none());
    }

    #[rstest]
    #[case("zz\r\nhi\r\n0\r\n\r\n", HttpParseError::InvalidChunkFraming)]
    #[case("\r\nhi\r\n0\r\n\r\n", HttpParseError::InvalidChunkFraming)]
    #[case("2\r\nhiXX0\r\n\r\n", HttpParseError::InvalidChunkFraming)]
    #[tokio::test]
    async fn malformed_chunks(#[case] chunks: &str, #[case] expected: HttpParseError) {
        let input = format!("POST / HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n{}", chunks);
        assert_eq!(parse_error_of(&input).await, expected);
    }

    #[tokio::test]
    async fn chunked_total_over_limit_is_payload_too_large() {
        let limits = ParserLimits { max_body: 8, ..ParserLimits::default() };
        let input = "POST / HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n\
                     5\r\nhello\r\n5\r\nworld\r\n0\r\n\r\n";
        let mut stream = std::io::Cursor::new(input.as_bytes().to_vec());
        let result = parser_with(limits).parse(&mut stream).await;
        assert!(matches!(result, Err(Error::ParseError(HttpParseError::PayloadTooLarge))));
    }

    #[tokio::test]
    async fn chunked_with_content_length_is_rejected() {
        let input = "POST / HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\nContent-Length: 5\r\n\r\n";
        assert_eq!(parse_error_of(input).await, HttpParseError::ConflictingFraming);
    }

    #[tokio::test]
    async fn unrecognized_transfer_encoding_falls_back_to_empty_body() {
        let request = parse_str("POST / HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: gzip\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert!(request.body.is_empty());
    }
}
