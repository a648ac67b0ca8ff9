// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use phf::phf_map;
use unicase::UniCase;

use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MediaType {
    Common(&'static str),
}

impl MediaType {
    pub fn as_str(&self) -> &str {
        match self {
            MediaType::Common(s) => s,
        }
    }
}

impl MediaType {
    //
    // General
    //
    pub const OCTET_STREAM: MediaType = MediaType::Common("application/octet-stream");

    //
    // Text
    //
    pub const CASCADING_STYLE_SHEETS: MediaType = MediaType::Common("text/css; charset=UTF-8");
    pub const HTML: MediaType = MediaType::Common("text/html; charset=UTF-8");
    pub const JAVASCRIPT: MediaType = MediaType::Common("text/javascript; charset=UTF-8");
    pub const PLAIN_TEXT: MediaType = MediaType::Common("text/plain; charset=UTF-8");

    //
    // Application
    //
    pub const JSON: MediaType = MediaType::Common("application/json; charset=UTF-8");
    pub const PDF: MediaType = MediaType::Common("application/pdf");
    pub const XML: MediaType = MediaType::Common("application/xml; charset=UTF-8");
    pub const ZIP: MediaType = MediaType::Common("application/zip");

    //
    // Image
    //
    pub const GIF: MediaType = MediaType::Common("image/gif");
    pub const ICO: MediaType = MediaType::Common("image/x-icon");
    pub const JPEG: MediaType = MediaType::Common("image/jpeg");
    pub const PNG: MediaType = MediaType::Common("image/png");
    pub const SVG: MediaType = MediaType::Common("image/svg+xml");

    /// Returns the media type for the given extension, falling back
    /// to `application/octet-stream` for anything unrecognized.
    #[must_use]
    pub fn from_extension(extension: &str) -> &'static MediaType {
        MEDIA_TYPE_BY_EXTENSION.get(&UniCase::ascii(extension)).unwrap_or(&MediaType::OCTET_STREAM)
    }

    #[must_use]
    pub fn from_path(path: &Path) -> &'static MediaType {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some(extension) => MediaType::from_extension(extension),
            None => &MediaType::OCTET_STREAM,
        }
    }
}

static MEDIA_TYPE_BY_EXTENSION: phf::Map<UniCase<&'static str>, MediaType> = phf_map!(
    UniCase::ascii("css") => MediaType::CASCADING_STYLE_SHEETS,
    UniCase::ascii("htm") => MediaType::HTML,
    UniCase::ascii("html") => MediaType::HTML,
    UniCase::ascii("js") => MediaType::JAVASCRIPT,
    UniCase::ascii("txt") => MediaType::PLAIN_TEXT,

    UniCase::ascii("json") => MediaType::JSON,
    UniCase::ascii("pdf") => MediaType::PDF,
    UniCase::ascii("xml") => MediaType::XML,
    UniCase::ascii("zip") => MediaType::ZIP,

    UniCase::ascii("gif") => MediaType::GIF,
    UniCase::ascii("ico") => MediaType::ICO,
    UniCase::ascii("jpeg") => MediaType::JPEG,
    UniCase::ascii("jpg") => MediaType::JPEG,
    UniCase::ascii("png") => MediaType::PNG,
    UniCase::ascii("svg") => MediaType::SVG,
);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("index.html", "text/html; charset=UTF-8")]
    #[case("legacy.HTM", "text/html; charset=UTF-8")]
    #[case("style.css", "text/css; charset=UTF-8")]
    #[case("app.js", "text/javascript; charset=UTF-8")]
    #[case("data.json", "application/json; charset=UTF-8")]
    #[case("feed.xml", "application/xml; charset=UTF-8")]
    #[case("notes.txt", "text/plain; charset=UTF-8")]
    #[case("logo.png", "image/png")]
    #[case("photo.jpg", "image/jpeg")]
    #[case("photo.jpeg", "image/jpeg")]
    #[case("anim.gif", "image/gif")]
    #[case("icon.svg", "image/svg+xml")]
    #[case("favicon.ico", "image/x-icon")]
    #[case("paper.pdf", "application/pdf")]
    #[case("bundle.zip", "application/zip")]
    #[case("archive.tar", "application/octet-stream")]
    #[case("README", "application/octet-stream")]
    fn media_type_by_path(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(MediaType::from_path(Path::new(path)).as_str(), expected);
    }
}
