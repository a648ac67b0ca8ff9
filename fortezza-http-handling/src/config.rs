// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// The DoS caps the request parser enforces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ParserLimits {
    /// Maximum request-line length in bytes, excluding the CRLF.
    pub max_request_line: usize,

    /// Maximum total size of the header section in bytes, each line
    /// counted including its CRLF.
    pub max_header_section: usize,

    /// Maximum number of header fields.
    pub max_headers: usize,

    /// Maximum body size in bytes, for both `Content-Length` and
    /// decoded chunked bodies.
    pub max_body: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_request_line: 8192,
            max_header_section: 8192,
            max_headers: 100,
            max_body: 10 * 1024 * 1024,
        }
    }
}

/// The configuration record handed to the server by the host
/// environment.
#[derive(Clone, Debug)]
pub struct Settings {
    pub listen_address: String,
    pub limits: ParserLimits,

    /// If the client doesn't transmit anything within this time in a
    /// keep-alive iteration, the connection is terminated.
    pub read_timeout: Duration,

    pub document_root: PathBuf,

    /// Matched against the request path before file resolution.
    pub metrics_path: String,

    pub access_log_enabled: bool,
    pub metrics_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1:8080".to_owned(),
            limits: ParserLimits::default(),
            read_timeout: Duration::from_secs(15),
            document_root: PathBuf::from("./public"),
            metrics_path: "/metrics".to_owned(),
            access_log_enabled: true,
            metrics_enabled: true,
        }
    }
}

impl Settings {
    /// Read the configuration from `FORTEZZA_*` environment
    /// variables. An unset variable keeps its default; a variable
    /// that doesn't parse keeps the default and logs a warning.
    pub fn from_env() -> Settings {
        let defaults = Settings::default();
        Settings {
            listen_address: env_string("FORTEZZA_LISTEN", defaults.listen_address),
            limits: ParserLimits {
                max_request_line: env_parsed("FORTEZZA_MAX_REQUEST_LINE", defaults.limits.max_request_line),
                max_header_section: env_parsed("FORTEZZA_MAX_HEADER_SECTION", defaults.limits.max_header_section),
                max_headers: env_parsed("FORTEZZA_MAX_HEADERS", defaults.limits.max_headers),
                max_body: env_parsed("FORTEZZA_MAX_BODY", defaults.limits.max_body),
            },
            read_timeout: Duration::from_secs(env_parsed("FORTEZZA_READ_TIMEOUT_SECS", defaults.read_timeout.as_secs())),
            document_root: PathBuf::from(env_string("FORTEZZA_DOCUMENT_ROOT", defaults.document_root.to_string_lossy().into_owned())),
            metrics_path: env_string("FORTEZZA_METRICS_PATH", defaults.metrics_path),
            access_log_enabled: env_flag("FORTEZZA_ACCESS_LOG", defaults.access_log_enabled),
            metrics_enabled: env_flag("FORTEZZA_METRICS", defaults.metrics_enabled),
        }
    }
}

fn env_string(name: &str, default: String) -> String {
    env::var(name).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => match value.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                log::warn!("Invalid value for {}: {:?}, using default", name, value);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => match parse_flag(&value) {
            Some(flag) => flag,
            None => {
                log::warn!("Invalid value for {}: {:?}, using default", name, value);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
